use std::f32::consts::PI;

/// Demo catalog entry. Consumers treat the record as opaque metadata; only
/// the synth keeps a mapping from id to composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoTrack {
    pub id: &'static str,
    pub title: &'static str,
    pub artist: Option<&'static str>,
    pub url: &'static str,
    sections: &'static [Section],
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Silence {
        seconds: f32,
    },
    PulseGrid {
        seconds: f32,
        bpm: f32,
        freq_low: f32,
        freq_click: f32,
    },
    Pad {
        seconds: f32,
        level: f32,
    },
    Transients {
        seconds: f32,
        bpm: f32,
    },
    Chirp {
        seconds: f32,
        start_hz: f32,
        end_hz: f32,
        level: f32,
    },
}

impl Section {
    fn seconds(&self) -> f32 {
        match *self {
            Self::Silence { seconds }
            | Self::PulseGrid { seconds, .. }
            | Self::Pad { seconds, .. }
            | Self::Transients { seconds, .. }
            | Self::Chirp { seconds, .. } => seconds,
        }
    }
}

pub const DEMO_TRACKS: &[DemoTrack] = &[
    DemoTrack {
        id: "pulse-120",
        title: "Pulse Grid 120",
        artist: None,
        url: "demo://pulse-120",
        sections: &[
            Section::Silence { seconds: 0.5 },
            Section::PulseGrid {
                seconds: 16.0,
                bpm: 120.0,
                freq_low: 62.0,
                freq_click: 2200.0,
            },
            Section::Pad {
                seconds: 8.0,
                level: 0.65,
            },
            Section::Chirp {
                seconds: 6.0,
                start_hz: 120.0,
                end_hz: 8000.0,
                level: 0.7,
            },
            Section::Silence { seconds: 0.5 },
        ],
    },
    DemoTrack {
        id: "midnight-pad",
        title: "Midnight Pad",
        artist: Some("Demo Ensemble"),
        url: "demo://midnight-pad",
        sections: &[
            Section::Pad {
                seconds: 20.0,
                level: 0.6,
            },
            Section::Chirp {
                seconds: 8.0,
                start_hz: 80.0,
                end_hz: 1600.0,
                level: 0.4,
            },
            Section::Pad {
                seconds: 12.0,
                level: 0.5,
            },
        ],
    },
    DemoTrack {
        id: "strobe-160",
        title: "Strobe 160",
        artist: None,
        url: "demo://strobe-160",
        sections: &[
            Section::Transients {
                seconds: 24.0,
                bpm: 160.0,
            },
            Section::PulseGrid {
                seconds: 8.0,
                bpm: 160.0,
                freq_low: 55.0,
                freq_click: 5200.0,
            },
        ],
    },
];

pub fn find(id: &str) -> Option<&'static DemoTrack> {
    DEMO_TRACKS.iter().find(|t| t.id == id)
}

pub fn default_track() -> &'static DemoTrack {
    &DEMO_TRACKS[0]
}

/// Streaming synthesizer for one demo track. Produces mono samples in
/// [-1, 1]; the composition loops when its last section ends.
pub struct TrackSynth {
    sections: &'static [Section],
    cursor: usize,
    t_in_section: f64,
    sample_dt: f64,
    noise: fastrand::Rng,
}

impl TrackSynth {
    pub fn new(track: &DemoTrack, sample_rate: u32) -> Self {
        let mut seed = 0u64;
        for b in track.id.bytes() {
            seed = seed.wrapping_mul(31).wrapping_add(b as u64);
        }
        Self {
            sections: track.sections,
            cursor: 0,
            t_in_section: 0.0,
            sample_dt: 1.0 / sample_rate.max(1) as f64,
            noise: fastrand::Rng::with_seed(seed | 1),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let section = self.sections[self.cursor];
        let t = self.t_in_section as f32;
        let v = match section {
            Section::Silence { .. } => 0.0,
            Section::PulseGrid {
                bpm,
                freq_low,
                freq_click,
                ..
            } => pulse_grid(t, bpm, freq_low, freq_click),
            Section::Pad { level, .. } => pad(t) * level,
            Section::Transients { bpm, .. } => {
                let n = self.noise.f32() * 2.0 - 1.0;
                transients(t, bpm, n)
            }
            Section::Chirp {
                seconds,
                start_hz,
                end_hz,
                level,
            } => chirp(t, seconds, start_hz, end_hz, level),
        };

        self.t_in_section += self.sample_dt;
        if self.t_in_section as f32 >= section.seconds() {
            self.t_in_section = 0.0;
            self.cursor = (self.cursor + 1) % self.sections.len();
        }
        v.clamp(-1.0, 1.0)
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for slot in out {
            *slot = self.next_sample();
        }
    }
}

fn pulse_grid(t: f32, bpm: f32, freq_low: f32, freq_click: f32) -> f32 {
    let period = 60.0 / bpm.max(1.0);
    let t_in_beat = t % period;
    let pulse_len = 0.020;
    if t_in_beat >= pulse_len {
        return 0.0;
    }
    // Fast attack, short decay.
    let env = (1.0 - t_in_beat / pulse_len).max(0.0).powf(2.4);
    let s_low = (2.0 * PI * freq_low * t_in_beat).sin() * 0.92;
    let s_click = (2.0 * PI * freq_click * t_in_beat).sin() * 0.35;
    (s_low + s_click) * env
}

fn pad(t: f32) -> f32 {
    let a = (2.0 * PI * (110.0 + 8.0 * (t * 0.21).sin()) * t).sin() * 0.45;
    let b = (2.0 * PI * (220.0 + 16.0 * (t * 0.17).cos()) * t).sin() * 0.25;
    let c = (2.0 * PI * (440.0 + 24.0 * (t * 0.13).sin()) * t).sin() * 0.12;
    a + b + c
}

fn transients(t: f32, bpm: f32, noise: f32) -> f32 {
    let beat_period = 60.0 / bpm.max(1.0);
    let phase = (t / beat_period).fract();
    let hit = if phase < 0.06 { 1.0 } else { 0.0 };

    let low = (2.0 * PI * 55.0 * t).sin() * (0.45 + 0.45 * hit);
    let mid = (2.0 * PI * 330.0 * t).sin() * 0.22;
    let hat = (2.0 * PI * 5500.0 * t).sin() * (0.05 + 0.25 * hit);
    low + mid + hat + noise * (0.03 + 0.15 * hit)
}

fn chirp(t: f32, seconds: f32, start_hz: f32, end_hz: f32, level: f32) -> f32 {
    let x = (t / seconds.max(1e-4)).clamp(0.0, 1.0);
    let f = start_hz * (end_hz / start_hz).powf(x);
    let env = 0.15 + 0.85 * (1.0 - (2.0 * x - 1.0).abs());
    (2.0 * PI * f * t).sin() * level * env
}

/// Total looped length of a track's composition in seconds.
pub fn composition_seconds(track: &DemoTrack) -> f32 {
    track.sections.iter().map(|s| s.seconds()).sum()
}
