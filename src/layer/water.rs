use super::{Layer, LayerError, LayerKind, ShaderSource, Transform, UniformSet};
use crate::theme::ColorTheme;

const VERT_SRC: &str = r#"
struct WaterUniforms {
    time: f32,
    audio_reactivity: f32,
    wave_speed: f32,
    ripple_frequency: f32,
    water_color: vec3<f32>,
    reflection_color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: WaterUniforms;
@group(1) @binding(0) var<uniform> view_proj: mat4x4<f32>;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) height: f32,
};

@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> VsOut {
    let phase = u.time * u.wave_speed;
    let r = length(pos.xz);
    let amp = 0.05 + 0.20 * u.audio_reactivity;
    let h = amp * sin(r * u.ripple_frequency - phase * 6.2831853)
          + amp * 0.5 * sin((pos.x + pos.z) * u.ripple_frequency * 0.7 + phase * 4.0);
    let world = vec3<f32>(pos.x, pos.y + h, pos.z);
    var out: VsOut;
    out.clip = view_proj * vec4<f32>(world, 1.0);
    out.world = world;
    out.height = h / max(amp, 1e-4);
    return out;
}
"#;

const FRAG_SRC: &str = r#"
struct WaterUniforms {
    time: f32,
    audio_reactivity: f32,
    wave_speed: f32,
    ripple_frequency: f32,
    water_color: vec3<f32>,
    reflection_color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: WaterUniforms;

@fragment
fn fs_main(
    @location(0) world: vec3<f32>,
    @location(1) height: f32,
) -> @location(0) vec4<f32> {
    let crest = clamp(0.5 + 0.5 * height, 0.0, 1.0);
    let sparkle = 0.5 + 0.5 * sin(u.time * u.wave_speed * 12.0 + world.x * 3.0 + world.z * 2.0);
    let mirror = crest * (0.4 + 0.6 * sparkle);
    let body = mix(u.water_color, u.reflection_color, mirror);
    let lit = body * (0.45 + 0.55 * u.audio_reactivity + 0.25 * crest);
    return vec4<f32>(lit, 0.9);
}
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterParams {
    pub wave_speed: f32,
    pub ripple_frequency: f32,
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            wave_speed: 0.3,
            ripple_frequency: 3.0,
        }
    }
}

impl WaterParams {
    fn validate(&self) -> Result<(), LayerError> {
        if !self.wave_speed.is_finite() || self.wave_speed < 0.0 {
            return Err(LayerError::InvalidParameter {
                field: "wave_speed",
                message: "must be finite and >= 0".to_string(),
            });
        }
        if !self.ripple_frequency.is_finite() || self.ripple_frequency <= 0.0 {
            return Err(LayerError::InvalidParameter {
                field: "ripple_frequency",
                message: "must be finite and > 0".to_string(),
            });
        }
        Ok(())
    }
}

pub struct ReflectiveWaterLayer {
    id: String,
    transform: Transform,
    uniforms: UniformSet,
}

impl ReflectiveWaterLayer {
    pub fn new(
        id: impl Into<String>,
        params: WaterParams,
        transform: Transform,
        theme: Option<&ColorTheme>,
    ) -> Result<Self, LayerError> {
        params.validate()?;
        let mut uniforms = UniformSet::new();
        uniforms.set_float("time", 0.0);
        uniforms.set_float("audio_reactivity", 0.0);
        uniforms.set_float("wave_speed", params.wave_speed);
        uniforms.set_float("ripple_frequency", params.ripple_frequency);

        let mut layer = Self {
            id: id.into(),
            transform,
            uniforms,
        };
        layer.apply_theme(theme.unwrap_or(&ColorTheme::FALLBACK));
        Ok(layer)
    }
}

impl Layer for ReflectiveWaterLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::ReflectiveWater
    }

    fn transform(&self) -> Transform {
        self.transform
    }

    fn shader(&self) -> ShaderSource {
        ShaderSource {
            vertex: VERT_SRC,
            fragment: FRAG_SRC,
        }
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    fn apply_theme(&mut self, theme: &ColorTheme) {
        self.uniforms
            .set_color("water_color", theme.secondary.to_unit());
        self.uniforms
            .set_color("reflection_color", theme.primary.to_unit());
    }
}
