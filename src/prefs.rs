use crate::config::{RendererMode, VisualMode};
use std::fmt;
use std::path::{Path, PathBuf};

/// Settings carried across sessions. Every field is optional so a missing
/// or partial file never invents values; the CLI and its defaults decide
/// what an absent field means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppPrefs {
    pub mode: Option<VisualMode>,
    pub theme: Option<String>,
    pub renderer: Option<RendererMode>,
    pub gain: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefsError {
    Io(String),
    Parse { line: usize, message: String },
}

impl fmt::Display for PrefsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
        }
    }
}

impl std::error::Error for PrefsError {}

impl AppPrefs {
    pub fn load(path: Option<&Path>) -> Result<Self, PrefsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(PrefsError::Io(err.to_string())),
        };

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, PrefsError> {
        let mut prefs = Self::default();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(PrefsError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let key = key_raw.trim();
            let value = value_raw.trim();
            match key {
                "mode" => {
                    prefs.mode = Some(VisualMode::parse(value).ok_or_else(|| PrefsError::Parse {
                        line: line_no,
                        message: format!("unknown mode '{value}'"),
                    })?);
                }
                "theme" => {
                    if value.is_empty() {
                        return Err(PrefsError::Parse {
                            line: line_no,
                            message: "theme must not be empty".to_string(),
                        });
                    }
                    prefs.theme = Some(value.to_ascii_lowercase());
                }
                "renderer" => {
                    prefs.renderer =
                        Some(RendererMode::parse(value).ok_or_else(|| PrefsError::Parse {
                            line: line_no,
                            message: format!("unknown renderer '{value}'"),
                        })?);
                }
                "gain" => {
                    let parsed = value.parse::<f32>().ok().filter(|g| g.is_finite());
                    let Some(gain) = parsed else {
                        return Err(PrefsError::Parse {
                            line: line_no,
                            message: "gain must be a finite number".to_string(),
                        });
                    };
                    prefs.gain = Some(gain.clamp(0.0, 8.0));
                }
                // Unknown keys survive round-trips from newer versions.
                _ => {}
            }
        }
        Ok(prefs)
    }

    pub fn to_text(&self) -> String {
        let mut body = String::from("# scene_visualizer runtime prefs v1\n");
        if let Some(mode) = self.mode {
            body.push_str(&format!("mode={}\n", mode.label()));
        }
        if let Some(theme) = &self.theme {
            body.push_str(&format!("theme={theme}\n"));
        }
        if let Some(renderer) = self.renderer {
            body.push_str(&format!("renderer={}\n", renderer.label()));
        }
        if let Some(gain) = self.gain {
            body.push_str(&format!("gain={gain:.3}\n"));
        }
        body
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), PrefsError> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrefsError::Io(e.to_string()))?;
        }
        // Write-then-rename so a crash mid-save never truncates the file.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(|e| PrefsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PrefsError::Io(e.to_string()))
    }
}

pub fn prefs_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("scene_visualizer").join("prefs.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("scene_visualizer")
            .join("prefs.txt"),
    )
}
