mod fog;
mod glass;
mod water;

pub use fog::{FogParams, VolumetricFogLayer};
pub use glass::{GlassParams, HolographicGlassLayer};
pub use water::{ReflectiveWaterLayer, WaterParams};

use crate::theme::ColorTheme;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3([f32; 3]),
    Color([f32; 3]),
}

/// Named, typed shader parameters for one material. Owned by its layer; the
/// frame driver only ever touches the shared `time`/`audio_reactivity`
/// entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    values: BTreeMap<&'static str, UniformValue>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_float(&mut self, name: &'static str, v: f32) {
        self.values.insert(name, UniformValue::Float(v));
    }

    pub fn set_int(&mut self, name: &'static str, v: i32) {
        self.values.insert(name, UniformValue::Int(v));
    }

    pub fn set_vec3(&mut self, name: &'static str, v: [f32; 3]) {
        self.values.insert(name, UniformValue::Vec3(v));
    }

    pub fn set_color(&mut self, name: &'static str, v: [f32; 3]) {
        self.values.insert(name, UniformValue::Color(v));
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(UniformValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<[f32; 3]> {
        match self.values.get(name) {
            Some(UniformValue::Color(v)) | Some(UniformValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn any_nan(&self) -> bool {
        self.values.values().any(|v| match v {
            UniformValue::Float(x) => !x.is_finite(),
            UniformValue::Int(_) => false,
            UniformValue::Vec3(xs) | UniformValue::Color(xs) => {
                xs.iter().any(|x| !x.is_finite())
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }

    pub fn scaled(mut self, s: f32) -> Self {
        self.scale = [s, s, s];
        self
    }
}

/// Vertex/fragment pair a host engine compiles for this material.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    HolographicGlass,
    ReflectiveWater,
    VolumetricFog,
}

impl LayerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HolographicGlass => "holographic-glass",
            Self::ReflectiveWater => "reflective-water",
            Self::VolumetricFog => "volumetric-fog",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    InvalidParameter { field: &'static str, message: String },
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { field, message } => {
                write!(f, "invalid parameter {field}: {message}")
            }
        }
    }
}

impl std::error::Error for LayerError {}

/// Per-frame inputs fanned out by the frame driver. `reactivity` is clamped
/// by each layer before it reaches a uniform.
#[derive(Debug, Clone, Copy)]
pub struct FrameCtx {
    pub time: f32,
    pub dt: f32,
    pub reactivity: f32,
}

pub fn clamp01(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

pub trait Layer {
    fn id(&self) -> &str;
    fn kind(&self) -> LayerKind;
    fn transform(&self) -> Transform;
    fn shader(&self) -> ShaderSource;
    fn uniforms(&self) -> &UniformSet;
    fn uniforms_mut(&mut self) -> &mut UniformSet;

    /// Driver entry point: writes the shared uniform subset, then runs the
    /// layer's own per-frame logic with the clamped value.
    fn begin_frame(&mut self, ctx: &FrameCtx) {
        let r = clamp01(ctx.reactivity);
        let u = self.uniforms_mut();
        u.set_float("time", ctx.time);
        u.set_float("audio_reactivity", r);
        self.animate(&FrameCtx {
            reactivity: r,
            ..*ctx
        });
    }

    /// Layer-private per-frame uniform updates. Most layers leave their
    /// private uniforms alone after construction.
    fn animate(&mut self, _ctx: &FrameCtx) {}

    /// Reseeds color-derived uniforms from a new palette. Must not touch
    /// `time` or `audio_reactivity`.
    fn apply_theme(&mut self, theme: &ColorTheme);
}
