use super::{FrameCtx, Layer, LayerError, LayerKind, ShaderSource, Transform, UniformSet};
use crate::theme::ColorTheme;

const VERT_SRC: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) ray: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) idx: u32) -> VsOut {
    // Fullscreen triangle.
    let x = f32(i32(idx & 1u) * 4 - 1);
    let y = f32(i32(idx >> 1u) * 4 - 1);
    var out: VsOut;
    out.clip = vec4<f32>(x, y, 0.0, 1.0);
    out.ray = vec2<f32>(x, y);
    return out;
}
"#;

const FRAG_SRC: &str = r#"
struct FogUniforms {
    time: f32,
    audio_reactivity: f32,
    light_intensity: f32,
    density: f32,
    march_distance: f32,
    march_steps: i32,
    light_color: vec3<f32>,
    ambient_color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: FogUniforms;

@fragment
fn fs_main(@location(0) ray: vec2<f32>) -> @location(0) vec4<f32> {
    let steps = max(u.march_steps, 1);
    let step_len = u.march_distance / f32(steps);
    var accum = vec3<f32>(0.0);
    var transmit = 1.0;
    for (var i = 0; i < steps; i++) {
        let d = f32(i) * step_len;
        let swirl = sin(ray.x * 2.0 + u.time * 0.3 + d * 0.5)
                  * cos(ray.y * 2.0 - u.time * 0.2 + d * 0.3);
        let local = u.density * (0.6 + 0.4 * swirl) * (0.7 + 0.6 * u.audio_reactivity);
        let absorb = exp(-local * step_len);
        let glow = u.light_color * u.light_intensity * local / f32(steps);
        accum += transmit * glow;
        transmit *= absorb;
    }
    let body = accum + u.ambient_color * 0.08 * transmit;
    return vec4<f32>(body, 1.0 - transmit);
}
"#;

const MARCH_DISTANCE_BASE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub light_intensity: f32,
    pub march_steps: i32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            light_intensity: 2.0,
            march_steps: 16,
        }
    }
}

impl FogParams {
    fn validate(&self) -> Result<(), LayerError> {
        if !self.light_intensity.is_finite() || self.light_intensity < 0.0 {
            return Err(LayerError::InvalidParameter {
                field: "light_intensity",
                message: "must be finite and >= 0".to_string(),
            });
        }
        if !(1..=128).contains(&self.march_steps) {
            return Err(LayerError::InvalidParameter {
                field: "march_steps",
                message: "must be in 1..=128".to_string(),
            });
        }
        Ok(())
    }
}

pub struct VolumetricFogLayer {
    id: String,
    transform: Transform,
    uniforms: UniformSet,
}

impl VolumetricFogLayer {
    pub fn new(
        id: impl Into<String>,
        params: FogParams,
        transform: Transform,
        theme: Option<&ColorTheme>,
    ) -> Result<Self, LayerError> {
        params.validate()?;
        let mut uniforms = UniformSet::new();
        uniforms.set_float("time", 0.0);
        uniforms.set_float("audio_reactivity", 0.0);
        uniforms.set_float("light_intensity", params.light_intensity);
        uniforms.set_int("march_steps", params.march_steps);
        uniforms.set_float("march_distance", MARCH_DISTANCE_BASE);
        uniforms.set_float("density", 0.35);

        let mut layer = Self {
            id: id.into(),
            transform,
            uniforms,
        };
        layer.apply_theme(theme.unwrap_or(&ColorTheme::FALLBACK));
        Ok(layer)
    }
}

impl Layer for VolumetricFogLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::VolumetricFog
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

    // March reach breathes slowly; this is the one private uniform this
    // layer animates per frame.
    fn animate(&mut self, ctx: &FrameCtx) {
        let reach = MARCH_DISTANCE_BASE * (1.0 + 0.15 * (ctx.time * 0.4).sin());
        self.uniforms.set_float("march_distance", reach);
    }

    fn apply_theme(&mut self, theme: &ColorTheme) {
        self.uniforms
            .set_color("light_color", theme.primary.to_unit());
        self.uniforms
            .set_color("ambient_color", theme.secondary.to_unit());
    }
}
