use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "scene-visualizer",
    version,
    about = "Audio-reactive 3D shader scene with a terminal preview"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = SignalSource::Demo)]
    pub source: SignalSource,

    /// Starting visualization mode. Defaults to the last session's mode,
    /// then to rings.
    #[arg(long, value_enum)]
    pub mode: Option<VisualMode>,

    /// Color theme id. Defaults to the last session's theme, then to aurora.
    #[arg(long)]
    pub theme: Option<String>,

    /// Extra palette manifest merged into the registry at startup.
    #[arg(long)]
    pub theme_file: Option<String>,

    /// Demo track id (see --list-tracks).
    #[arg(long)]
    pub track: Option<String>,

    /// Terminal renderer. Defaults to the last session's renderer, then to
    /// auto-detection.
    #[arg(long, value_enum)]
    pub renderer: Option<RendererMode>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, value_enum, default_value_t = Quality::Balanced)]
    pub quality: Quality,

    /// Reactivity gain. Defaults to the last session's gain, then to 1.0.
    #[arg(long)]
    pub gain: Option<f32>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, default_value_t = false)]
    pub list_tracks: bool,

    /// Substring match against input device names.
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignalSource {
    Demo,
    Mic,
}

impl SignalSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Mic => "mic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisualMode {
    Rings,
    Spectrum,
}

impl VisualMode {
    pub fn all() -> [Self; 2] {
        [Self::Rings, Self::Spectrum]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rings => "rings",
            Self::Spectrum => "spectrum",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Rings => Self::Spectrum,
            Self::Spectrum => Self::Rings,
        }
    }

    /// Strict name match; anything else is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rings" => Some(Self::Rings),
            "spectrum" => Some(Self::Spectrum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    Auto,
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}

impl RendererMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ascii => "ascii",
            Self::HalfBlock => "half-block",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "ascii" | "ansi" | "text" => Some(Self::Ascii),
            "half-block" | "halfblock" | "half_block" | "hb" => Some(Self::HalfBlock),
            _ => None,
        }
    }

    /// Runtime cycle order; Auto is a startup-only state and resolves before
    /// cycling starts.
    pub fn next(self) -> Self {
        match self {
            Self::Auto | Self::Ascii => Self::HalfBlock,
            Self::HalfBlock => Self::Ascii,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    High,
    Balanced,
    Fast,
}

impl Quality {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Fast => "fast",
        }
    }

    /// March step count for the fog volume at this quality.
    pub fn fog_march_steps(self) -> i32 {
        match self {
            Self::High => 24,
            Self::Balanced => 16,
            Self::Fast => 8,
        }
    }
}
