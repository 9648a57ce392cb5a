use crate::audio::{BAND_COUNT, ReactivitySample};
use crate::config::VisualMode;
use crate::frame::{FrameDriver, FrameTick};
use crate::layer::{
    FogParams, GlassParams, HolographicGlassLayer, Layer, LayerError, LayerKind,
    ReflectiveWaterLayer, ShaderSource, Transform, UniformSet, VolumetricFogLayer, WaterParams,
    clamp01,
};
use crate::theme::{ColorTheme, ThemeRegistry};

pub const RING_COUNT: usize = 3;

/// Constructor parameters shared by every mount plan. Changing any of them
/// invalidates the mounted set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTuning {
    pub glass: GlassParams,
    pub water: WaterParams,
    pub fog: FogParams,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            glass: GlassParams::default(),
            water: WaterParams::default(),
            fog: FogParams::default(),
        }
    }
}

/// Everything that distinguishes one mounted layer from another. Two equal
/// specs under the same id mean the existing instance can be kept as-is.
#[derive(Debug, Clone, PartialEq)]
enum LayerSpec {
    Glass {
        params: GlassParams,
        transform: Transform,
        band: Option<usize>,
    },
    Water {
        params: WaterParams,
        transform: Transform,
    },
    Fog {
        params: FogParams,
        transform: Transform,
    },
}

impl LayerSpec {
    fn band(&self) -> Option<usize> {
        match self {
            Self::Glass { band, .. } => *band,
            _ => None,
        }
    }
}

struct LayerPlan {
    id: String,
    spec: LayerSpec,
}

struct MountedLayer {
    spec: LayerSpec,
    generation: u64,
    layer: Box<dyn Layer>,
}

/// One mounted layer as the host engine sees it.
pub struct SceneNode<'a> {
    pub id: &'a str,
    pub kind: LayerKind,
    pub transform: Transform,
    pub shader: ShaderSource,
    pub uniforms: &'a UniformSet,
    pub generation: u64,
}

/// Owns the mounted layer set and the active mode/theme. Setters record the
/// desired state; `compose` applies it on the next pass, rebuilding only
/// what the dependency key says changed.
pub struct SceneComposer {
    mode: VisualMode,
    theme_id: String,
    theme: ColorTheme,
    tuning: SceneTuning,
    mounted: Vec<MountedLayer>,
    omitted: Vec<(String, LayerError)>,
    built_key: Option<(VisualMode, SceneTuning)>,
    built_theme: Option<String>,
    remounts: u64,
    theme_refreshes: u64,
}

impl SceneComposer {
    pub fn new(
        mode: VisualMode,
        theme_id: &str,
        registry: &ThemeRegistry,
        tuning: SceneTuning,
    ) -> Self {
        Self {
            mode,
            theme_id: theme_id.to_ascii_lowercase(),
            theme: registry.resolve(theme_id),
            tuning,
            mounted: Vec::new(),
            omitted: Vec::new(),
            built_key: None,
            built_theme: None,
            remounts: 0,
            theme_refreshes: 0,
        }
    }

    pub fn mode(&self) -> VisualMode {
        self.mode
    }

    pub fn theme_id(&self) -> &str {
        &self.theme_id
    }

    pub fn theme(&self) -> ColorTheme {
        self.theme
    }

    pub fn set_mode(&mut self, mode: VisualMode) {
        self.mode = mode;
    }

    pub fn set_theme(&mut self, id: &str, registry: &ThemeRegistry) {
        self.theme_id = id.to_ascii_lowercase();
        self.theme = registry.resolve(id);
    }

    pub fn set_tuning(&mut self, tuning: SceneTuning) {
        self.tuning = tuning;
    }

    /// Applies pending mode/theme/tuning changes. Layer construction
    /// failures drop only the failing layer; it is retried on the next
    /// remount.
    pub fn compose(&mut self) {
        let key = (self.mode, self.tuning);
        if self.built_key != Some(key) {
            self.remount();
            self.built_key = Some(key);
            self.built_theme = Some(self.theme_id.clone());
            return;
        }

        if self.built_theme.as_deref() != Some(self.theme_id.as_str()) {
            for m in &mut self.mounted {
                m.layer.apply_theme(&self.theme);
                m.generation += 1;
            }
            self.built_theme = Some(self.theme_id.clone());
            self.theme_refreshes += 1;
        }
    }

    fn remount(&mut self) {
        let plans = plan_for(self.mode, &self.tuning);
        let mut previous = std::mem::take(&mut self.mounted);
        let theme_changed = self.built_theme.as_deref() != Some(self.theme_id.as_str());
        self.omitted.clear();

        for plan in plans {
            let existing = previous
                .iter()
                .position(|m| m.layer.id() == plan.id && m.spec == plan.spec);
            if let Some(pos) = existing {
                let mut kept = previous.swap_remove(pos);
                if theme_changed {
                    kept.layer.apply_theme(&self.theme);
                    kept.generation += 1;
                }
                self.mounted.push(kept);
                continue;
            }

            match build_layer(&plan, &self.theme) {
                Ok(layer) => self.mounted.push(MountedLayer {
                    spec: plan.spec,
                    generation: 1,
                    layer,
                }),
                Err(err) => self.omitted.push((plan.id, err)),
            }
        }

        // Whatever is left in `previous` unmounts here.
        self.remounts += 1;
    }

    /// Per-frame step: fan out the shared inputs, then map band i onto
    /// segment i when the active mode consumes the spectrum.
    pub fn frame(&mut self, tick: FrameTick, sample: &ReactivitySample, driver: &mut FrameDriver) {
        driver.drive(
            tick,
            sample,
            self.mounted
                .iter_mut()
                .map(|m| m.layer.as_mut() as &mut dyn Layer),
        );

        if self.mode == VisualMode::Spectrum {
            for m in &mut self.mounted {
                if let Some(i) = m.spec.band() {
                    let level = sample.bands.get(i).copied().unwrap_or(0.0);
                    m.layer.uniforms_mut().set_float("band_level", clamp01(level));
                }
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = SceneNode<'_>> {
        self.mounted.iter().map(|m| SceneNode {
            id: m.layer.id(),
            kind: m.layer.kind(),
            transform: m.layer.transform(),
            shader: m.layer.shader(),
            uniforms: m.layer.uniforms(),
            generation: m.generation,
        })
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    pub fn omitted(&self) -> &[(String, LayerError)] {
        &self.omitted
    }

    pub fn remounts(&self) -> u64 {
        self.remounts
    }

    pub fn theme_refreshes(&self) -> u64 {
        self.theme_refreshes
    }
}

fn plan_for(mode: VisualMode, tuning: &SceneTuning) -> Vec<LayerPlan> {
    // Mount order is paint order: backdrop fog, then water, then glass.
    let mut plans = vec![
        LayerPlan {
            id: "fog_volume".to_string(),
            spec: LayerSpec::Fog {
                params: tuning.fog,
                transform: Transform::default(),
            },
        },
        LayerPlan {
            id: "water_floor".to_string(),
            spec: LayerSpec::Water {
                params: tuning.water,
                transform: Transform::at(0.0, -1.2, 0.0).scaled(6.0),
            },
        },
    ];

    match mode {
        VisualMode::Rings => {
            for i in 0..RING_COUNT {
                plans.push(LayerPlan {
                    id: format!("glass_ring_{i}"),
                    spec: LayerSpec::Glass {
                        params: tuning.glass,
                        transform: Transform::default().scaled(1.0 + i as f32 * 0.75),
                        band: None,
                    },
                });
            }
        }
        VisualMode::Spectrum => {
            for i in 0..BAND_COUNT {
                let x = (i as f32 - (BAND_COUNT as f32 - 1.0) / 2.0) * 0.6;
                plans.push(LayerPlan {
                    id: format!("spectrum_bar_{i:02}"),
                    spec: LayerSpec::Glass {
                        params: tuning.glass,
                        transform: Transform::at(x, 0.0, 0.0).scaled(0.45),
                        band: Some(i),
                    },
                });
            }
        }
    }

    plans
}

fn build_layer(plan: &LayerPlan, theme: &ColorTheme) -> Result<Box<dyn Layer>, LayerError> {
    match &plan.spec {
        LayerSpec::Glass {
            params, transform, ..
        } => Ok(Box::new(HolographicGlassLayer::new(
            plan.id.clone(),
            *params,
            *transform,
            Some(theme),
        )?)),
        LayerSpec::Water { params, transform } => Ok(Box::new(ReflectiveWaterLayer::new(
            plan.id.clone(),
            *params,
            *transform,
            Some(theme),
        )?)),
        LayerSpec::Fog { params, transform } => Ok(Box::new(VolumetricFogLayer::new(
            plan.id.clone(),
            *params,
            *transform,
            Some(theme),
        )?)),
    }
}
