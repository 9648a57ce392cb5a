use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTheme {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub tertiary: Rgb,
}

impl ColorTheme {
    /// Palette used when a theme or one of its slots is unavailable.
    pub const FALLBACK: Self = Self {
        primary: Rgb::new(0x00, 0xff, 0xff),
        secondary: Rgb::new(0xff, 0x00, 0xff),
        tertiary: Rgb::new(0xff, 0xff, 0x00),
    };
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeError {
    Io(String),
    Parse { line: usize, message: String },
    MissingField(&'static str),
    InvalidValue { field: &'static str, message: String },
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value for {field}: {message}")
            }
        }
    }
}

impl std::error::Error for ThemeError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeManifest {
    pub name: String,
    pub colors: ColorTheme,
}

impl ThemeManifest {
    pub fn parse(text: &str) -> Result<Self, ThemeError> {
        let mut name: Option<String> = None;
        let mut primary: Option<Rgb> = None;
        let mut secondary: Option<Rgb> = None;
        let mut tertiary: Option<Rgb> = None;

        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = trimmed.split_once('=').ok_or(ThemeError::Parse {
                line: line_no,
                message: "expected <key>=<value>".to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "name" => {
                    assign_once(
                        &mut name,
                        value.to_string(),
                        line_no,
                        "duplicate 'name' field",
                    )?;
                }
                "colors.primary" => {
                    let parsed = parse_color(value, line_no, "colors.primary")?;
                    assign_once(
                        &mut primary,
                        parsed,
                        line_no,
                        "duplicate 'colors.primary' field",
                    )?;
                }
                "colors.secondary" => {
                    let parsed = parse_color(value, line_no, "colors.secondary")?;
                    assign_once(
                        &mut secondary,
                        parsed,
                        line_no,
                        "duplicate 'colors.secondary' field",
                    )?;
                }
                "colors.tertiary" => {
                    let parsed = parse_color(value, line_no, "colors.tertiary")?;
                    assign_once(
                        &mut tertiary,
                        parsed,
                        line_no,
                        "duplicate 'colors.tertiary' field",
                    )?;
                }
                _ => {
                    return Err(ThemeError::Parse {
                        line: line_no,
                        message: format!("unknown key '{key}'"),
                    });
                }
            }
        }

        let manifest = Self {
            name: name.ok_or(ThemeError::MissingField("name"))?,
            colors: ColorTheme {
                primary: primary.ok_or(ThemeError::MissingField("colors.primary"))?,
                secondary: secondary.ok_or(ThemeError::MissingField("colors.secondary"))?,
                tertiary: tertiary.ok_or(ThemeError::MissingField("colors.tertiary"))?,
            },
        };

        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ThemeError> {
        let text =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ThemeError::Io(e.to_string()))?;
        Self::parse(&text)
    }

    pub fn to_text(&self) -> String {
        [
            format!("name={}", self.name),
            format!("colors.primary={}", self.colors.primary),
            format!("colors.secondary={}", self.colors.secondary),
            format!("colors.tertiary={}", self.colors.tertiary),
        ]
        .join("\n")
    }

    pub fn validate(&self) -> Result<(), ThemeError> {
        if self.name.trim().is_empty() {
            return Err(ThemeError::InvalidValue {
                field: "name",
                message: "name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn assign_once<T>(
    slot: &mut Option<T>,
    value: T,
    line: usize,
    duplicate_message: &str,
) -> Result<(), ThemeError> {
    if slot.is_some() {
        return Err(ThemeError::Parse {
            line,
            message: duplicate_message.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

fn parse_color(s: &str, line: usize, field: &'static str) -> Result<Rgb, ThemeError> {
    Rgb::parse_hex(s).ok_or(ThemeError::Parse {
        line,
        message: format!("invalid hex color for {field}"),
    })
}

pub struct ThemeRegistry {
    entries: Vec<(String, ColorTheme)>,
}

impl ThemeRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                (
                    "aurora".to_string(),
                    ColorTheme {
                        primary: Rgb::new(0x00, 0xe5, 0xff),
                        secondary: Rgb::new(0x7c, 0x4d, 0xff),
                        tertiary: Rgb::new(0x69, 0xf0, 0xae),
                    },
                ),
                (
                    "sunset".to_string(),
                    ColorTheme {
                        primary: Rgb::new(0xff, 0x6d, 0x00),
                        secondary: Rgb::new(0xff, 0x3d, 0x7f),
                        tertiary: Rgb::new(0xff, 0xd5, 0x4f),
                    },
                ),
                (
                    "neon".to_string(),
                    ColorTheme {
                        primary: Rgb::new(0xff, 0x00, 0xd4),
                        secondary: Rgb::new(0x00, 0xff, 0xf0),
                        tertiary: Rgb::new(0xb4, 0xff, 0x39),
                    },
                ),
                (
                    "glacier".to_string(),
                    ColorTheme {
                        primary: Rgb::new(0x8e, 0xcf, 0xff),
                        secondary: Rgb::new(0x2d, 0x5b, 0xd1),
                        tertiary: Rgb::new(0xe8, 0xf7, 0xff),
                    },
                ),
            ],
        }
    }

    /// Adds or replaces a palette under the given id.
    pub fn register(&mut self, id: &str, theme: ColorTheme) {
        let key = id.to_ascii_lowercase();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = theme;
        } else {
            self.entries.push((key, theme));
        }
    }

    pub fn register_manifest(&mut self, manifest: &ThemeManifest) {
        self.register(&manifest.name, manifest.colors);
    }

    pub fn contains(&self, id: &str) -> bool {
        let key = id.to_ascii_lowercase();
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Unknown ids resolve to the fallback palette; lookup never fails.
    pub fn resolve(&self, id: &str) -> ColorTheme {
        let key = id.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, theme)| *theme)
            .unwrap_or(ColorTheme::FALLBACK)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Id following `current` in registration order, wrapping at the end.
    pub fn next_id(&self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let key = current.to_ascii_lowercase();
        let pos = self.entries.iter().position(|(k, _)| *k == key);
        let next = match pos {
            Some(i) => (i + 1) % self.entries.len(),
            None => 0,
        };
        Some(self.entries[next].0.as_str())
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
