use super::{Layer, LayerError, LayerKind, ShaderSource, Transform, UniformSet};
use crate::theme::ColorTheme;

const VERT_SRC: &str = r#"
struct GlassUniforms {
    time: f32,
    audio_reactivity: f32,
    fresnel_power: f32,
    opacity: f32,
    band_level: f32,
    surface_color: vec3<f32>,
    glow_color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: GlassUniforms;
@group(1) @binding(0) var<uniform> view_proj: mat4x4<f32>;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) view_dir: vec3<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let swell = 1.0 + 0.04 * u.audio_reactivity * sin(u.time * 2.0 + pos.y * 4.0);
    let world = pos * swell;
    var out: VsOut;
    out.clip = view_proj * vec4<f32>(world, 1.0);
    out.normal = normalize(normal);
    out.view_dir = normalize(-world);
    return out;
}
"#;

const FRAG_SRC: &str = r#"
struct GlassUniforms {
    time: f32,
    audio_reactivity: f32,
    fresnel_power: f32,
    opacity: f32,
    band_level: f32,
    surface_color: vec3<f32>,
    glow_color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: GlassUniforms;

@fragment
fn fs_main(
    @location(0) normal: vec3<f32>,
    @location(1) view_dir: vec3<f32>,
) -> @location(0) vec4<f32> {
    let facing = clamp(dot(normalize(normal), normalize(view_dir)), 0.0, 1.0);
    let fresnel = pow(1.0 - facing, u.fresnel_power);
    let shimmer = 0.5 + 0.5 * sin(u.time * 1.3 + fresnel * 6.0);
    let drive = clamp(u.audio_reactivity + u.band_level, 0.0, 1.0);
    let tint = mix(u.surface_color, u.glow_color, fresnel * (0.6 + 0.4 * shimmer));
    let lit = tint * (0.35 + 0.65 * drive + fresnel);
    let alpha = u.opacity * (0.55 + 0.45 * fresnel);
    return vec4<f32>(lit, alpha);
}
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlassParams {
    pub fresnel_power: f32,
    pub opacity: f32,
}

impl Default for GlassParams {
    fn default() -> Self {
        Self {
            fresnel_power: 2.0,
            opacity: 0.6,
        }
    }
}

impl GlassParams {
    fn validate(&self) -> Result<(), LayerError> {
        if !self.fresnel_power.is_finite() || self.fresnel_power <= 0.0 {
            return Err(LayerError::InvalidParameter {
                field: "fresnel_power",
                message: "must be finite and > 0".to_string(),
            });
        }
        if !self.opacity.is_finite() || self.opacity <= 0.0 || self.opacity > 1.0 {
            return Err(LayerError::InvalidParameter {
                field: "opacity",
                message: "must be finite and in (0,1]".to_string(),
            });
        }
        Ok(())
    }
}

pub struct HolographicGlassLayer {
    id: String,
    transform: Transform,
    uniforms: UniformSet,
}

impl HolographicGlassLayer {
    pub fn new(
        id: impl Into<String>,
        params: GlassParams,
        transform: Transform,
        theme: Option<&ColorTheme>,
    ) -> Result<Self, LayerError> {
        params.validate()?;
        let mut uniforms = UniformSet::new();
        uniforms.set_float("time", 0.0);
        uniforms.set_float("audio_reactivity", 0.0);
        uniforms.set_float("fresnel_power", params.fresnel_power);
        uniforms.set_float("opacity", params.opacity);
        uniforms.set_float("band_level", 0.0);

        let mut layer = Self {
            id: id.into(),
            transform,
            uniforms,
        };
        layer.apply_theme(theme.unwrap_or(&ColorTheme::FALLBACK));
        Ok(layer)
    }
}

impl Layer for HolographicGlassLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::HolographicGlass
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
            .set_color("surface_color", theme.primary.to_unit());
        self.uniforms
            .set_color("glow_color", theme.tertiary.to_unit());
    }
}
