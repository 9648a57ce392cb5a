use crate::audio::ReactivitySample;
use crate::layer::{FrameCtx, Layer};
use std::time::Instant;

/// Longest dt credited for a single frame. A stalled host resumes with
/// continuous animation instead of a time jump.
const MAX_FRAME_DT: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    pub elapsed: f32,
    pub dt: f32,
}

/// Accumulates host instants into scene time. Elapsed starts at 0 on the
/// first tick and never decreases.
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: None,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let dt = match self.last {
            None => 0.0,
            Some(prev) => now
                .duration_since(prev)
                .as_secs_f32()
                .clamp(0.0, MAX_FRAME_DT),
        };
        self.last = Some(now);
        self.elapsed += dt;
        FrameTick {
            elapsed: self.elapsed,
            dt: dt.max(1e-6),
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure fan-out of the shared per-frame inputs. Holds no per-layer state;
/// every mounted layer receives the same tick and sample.
pub struct FrameDriver {
    frames: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self { frames: 0 }
    }

    pub fn drive<'a>(
        &mut self,
        tick: FrameTick,
        sample: &ReactivitySample,
        layers: impl IntoIterator<Item = &'a mut (dyn Layer + 'a)>,
    ) {
        let ctx = FrameCtx {
            time: tick.elapsed,
            dt: tick.dt,
            reactivity: sample.scalar,
        };
        for layer in layers {
            layer.begin_frame(&ctx);
        }
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}
