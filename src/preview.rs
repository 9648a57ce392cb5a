use crate::layer::LayerKind;
use crate::scene::SceneNode;

/// CPU approximation of the composed scene. Shades each mounted node from
/// its public uniform set and transform, nothing else, so it exercises the
/// same interface a GPU host would.
pub struct PreviewEngine {
    width: usize,
    height: usize,
    accum: Vec<[f32; 3]>,
    pixels: Vec<u8>,
}

struct FogShade {
    steps: i32,
    march_distance: f32,
    density: f32,
    light_intensity: f32,
    time: f32,
    reactivity: f32,
    light_color: [f32; 3],
    ambient_color: [f32; 3],
}

struct WaterShade {
    time: f32,
    reactivity: f32,
    wave_speed: f32,
    ripple_frequency: f32,
    water_color: [f32; 3],
    reflection_color: [f32; 3],
}

struct GlassShade {
    bar: bool,
    center_x: f32,
    radius: f32,
    half_width: f32,
    time: f32,
    reactivity: f32,
    fresnel_power: f32,
    opacity: f32,
    band_level: f32,
    surface_color: [f32; 3],
    glow_color: [f32; 3],
}

enum ShadePass {
    Fog(FogShade),
    Water(WaterShade),
    Glass(GlassShade),
}

const HORIZON_Y: f32 = -0.15;

impl PreviewEngine {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            accum: Vec::new(),
            pixels: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.accum = vec![[0.0; 3]; width * height];
        self.pixels = vec![0u8; width * height * 4];
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn render<'a>(&mut self, nodes: impl Iterator<Item = SceneNode<'a>>) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let passes: Vec<ShadePass> = nodes.filter_map(extract_pass).collect();

        self.clear_background();
        for pass in &passes {
            match pass {
                ShadePass::Fog(f) => self.paint_fog(f),
                ShadePass::Water(w) => self.paint_water(w),
                ShadePass::Glass(g) => self.paint_glass(g),
            }
        }
        self.quantize();
    }

    fn clear_background(&mut self) {
        let h = self.height.max(1) as f32;
        for y in 0..self.height {
            let fade = 0.035 * (1.0 - y as f32 / h);
            let base = [0.01 + fade * 0.4, 0.012 + fade * 0.6, 0.03 + fade];
            for x in 0..self.width {
                self.accum[y * self.width + x] = base;
            }
        }
    }

    fn ndc(&self, x: usize, y: usize) -> (f32, f32) {
        let aspect = self.width as f32 / self.height.max(1) as f32;
        let nx = (x as f32 / self.width as f32 * 2.0 - 1.0) * aspect.min(2.2);
        let ny = 1.0 - y as f32 / self.height as f32 * 2.0;
        (nx, ny)
    }

    fn paint_fog(&mut self, f: &FogShade) {
        let steps = f.steps.max(1);
        let step_len = f.march_distance / steps as f32;
        for y in 0..self.height {
            for x in 0..self.width {
                let (nx, ny) = self.ndc(x, y);
                let mut accum = [0.0f32; 3];
                let mut transmit = 1.0f32;
                for i in 0..steps {
                    let d = i as f32 * step_len;
                    let swirl = (nx * 2.0 + f.time * 0.3 + d * 0.5).sin()
                        * (ny * 2.0 - f.time * 0.2 + d * 0.3).cos();
                    let local =
                        (f.density * (0.6 + 0.4 * swirl) * (0.7 + 0.6 * f.reactivity)).max(0.0);
                    let absorb = (-local * step_len).exp();
                    for c in 0..3 {
                        accum[c] +=
                            transmit * f.light_color[c] * f.light_intensity * local
                                / steps as f32;
                    }
                    transmit *= absorb;
                }
                let px = &mut self.accum[y * self.width + x];
                for c in 0..3 {
                    px[c] = accum[c] + f.ambient_color[c] * 0.08 * transmit + px[c] * transmit;
                }
            }
        }
    }

    fn paint_water(&mut self, w: &WaterShade) {
        let phase = w.time * w.wave_speed;
        let amp = 0.05 + 0.20 * w.reactivity;
        for y in 0..self.height {
            for x in 0..self.width {
                let (nx, ny) = self.ndc(x, y);
                if ny > HORIZON_Y {
                    continue;
                }
                let px_ = nx * 3.0;
                let pz = (HORIZON_Y - ny) * 5.0;
                let r = (px_ * px_ + pz * pz).sqrt();
                let h = (r * w.ripple_frequency - phase * std::f32::consts::TAU).sin()
                    + 0.5 * ((px_ + pz) * w.ripple_frequency * 0.7 + phase * 4.0).sin();
                let contrast = amp / 0.25;
                let crest = (0.5 + 0.5 * h / 1.5 * contrast).clamp(0.0, 1.0);
                let sparkle =
                    0.5 + 0.5 * (w.time * w.wave_speed * 12.0 + px_ * 3.0 + pz * 2.0).sin();
                let mirror = crest * (0.4 + 0.6 * sparkle);
                let body = mix3(w.water_color, w.reflection_color, mirror);
                let lit = scale3(body, 0.35 + 0.45 * w.reactivity + 0.3 * crest);
                let edge = smoothstep(HORIZON_Y, HORIZON_Y - 0.05, ny);
                blend_over(&mut self.accum[y * self.width + x], lit, 0.9 * edge);
            }
        }
    }

    fn paint_glass(&mut self, g: &GlassShade) {
        if g.bar {
            self.paint_bar(g);
        } else {
            self.paint_ring(g);
        }
    }

    fn paint_ring(&mut self, g: &GlassShade) {
        let swell = 1.0 + 0.04 * g.reactivity * (g.time * 2.0).sin();
        let radius = g.radius * swell;
        let thickness = 0.035;
        let drive = (g.reactivity + g.band_level).clamp(0.0, 1.0);
        for y in 0..self.height {
            for x in 0..self.width {
                let (nx, ny) = self.ndc(x, y);
                let dist = (nx * nx + ny * ny).sqrt();
                let d = (dist - radius).abs();
                if d > thickness * 3.0 {
                    continue;
                }
                let edge = smoothstep(thickness * 3.0, 0.0, d);
                let fresnel = edge.powf(g.fresnel_power.max(0.1) * 0.5);
                let shimmer =
                    0.5 + 0.5 * (g.time * 1.3 + ny.atan2(nx) * 3.0 + fresnel * 6.0).sin();
                let tint = mix3(g.surface_color, g.glow_color, fresnel * (0.6 + 0.4 * shimmer));
                let lit = scale3(tint, 0.35 + 0.65 * drive + fresnel);
                let alpha = g.opacity * (0.55 + 0.45 * fresnel) * edge;
                blend_over(&mut self.accum[y * self.width + x], lit, alpha);
            }
        }
    }

    fn paint_bar(&mut self, g: &GlassShade) {
        let height = 0.12 + 0.85 * g.band_level;
        let top = HORIZON_Y + height;
        for y in 0..self.height {
            for x in 0..self.width {
                let (nx, ny) = self.ndc(x, y);
                if ny < HORIZON_Y || ny > top {
                    continue;
                }
                let dx = (nx - g.center_x).abs();
                if dx > g.half_width * 1.5 {
                    continue;
                }
                let edge = smoothstep(g.half_width * 1.5, g.half_width * 0.4, dx);
                let frac = ((ny - HORIZON_Y) / height.max(1e-4)).clamp(0.0, 1.0);
                let fresnel = (1.0 - edge).powf(g.fresnel_power.max(0.1)) + frac * 0.3;
                let tint = mix3(g.surface_color, g.glow_color, (frac + fresnel).clamp(0.0, 1.0));
                let lit = scale3(tint, 0.3 + 0.7 * (g.reactivity * 0.4 + g.band_level * 0.9));
                let alpha = g.opacity * (0.6 + 0.4 * frac) * edge;
                blend_over(&mut self.accum[y * self.width + x], lit, alpha);
            }
        }
    }

    fn quantize(&mut self) {
        for (i, rgb) in self.accum.iter().enumerate() {
            let o = i * 4;
            self.pixels[o] = (rgb[0].clamp(0.0, 1.0) * 255.0) as u8;
            self.pixels[o + 1] = (rgb[1].clamp(0.0, 1.0) * 255.0) as u8;
            self.pixels[o + 2] = (rgb[2].clamp(0.0, 1.0) * 255.0) as u8;
            self.pixels[o + 3] = 255;
        }
    }
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_pass(node: SceneNode<'_>) -> Option<ShadePass> {
    let u = node.uniforms;
    let time = u.float("time").unwrap_or(0.0);
    let reactivity = u.float("audio_reactivity").unwrap_or(0.0);
    match node.kind {
        LayerKind::VolumetricFog => Some(ShadePass::Fog(FogShade {
            steps: u.int("march_steps").unwrap_or(16),
            march_distance: u.float("march_distance").unwrap_or(8.0),
            density: u.float("density").unwrap_or(0.35),
            light_intensity: u.float("light_intensity").unwrap_or(2.0),
            time,
            reactivity,
            light_color: u.color("light_color").unwrap_or([0.0, 1.0, 1.0]),
            ambient_color: u.color("ambient_color").unwrap_or([1.0, 0.0, 1.0]),
        })),
        LayerKind::ReflectiveWater => Some(ShadePass::Water(WaterShade {
            time,
            reactivity,
            wave_speed: u.float("wave_speed").unwrap_or(0.3),
            ripple_frequency: u.float("ripple_frequency").unwrap_or(3.0),
            water_color: u.color("water_color").unwrap_or([1.0, 0.0, 1.0]),
            reflection_color: u.color("reflection_color").unwrap_or([0.0, 1.0, 1.0]),
        })),
        LayerKind::HolographicGlass => {
            let bar = node.id.starts_with("spectrum_bar_");
            Some(ShadePass::Glass(GlassShade {
                bar,
                center_x: node.transform.position[0] / 5.0,
                radius: 0.28 * node.transform.scale[0],
                half_width: 0.028 * node.transform.scale[0].max(0.1) / 0.45,
                time,
                reactivity,
                fresnel_power: u.float("fresnel_power").unwrap_or(2.0),
                opacity: u.float("opacity").unwrap_or(0.6),
                band_level: u.float("band_level").unwrap_or(0.0),
                surface_color: u.color("surface_color").unwrap_or([0.0, 1.0, 1.0]),
                glow_color: u.color("glow_color").unwrap_or([1.0, 1.0, 0.0]),
            }))
        }
    }
}

fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn scale3(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn blend_over(dst: &mut [f32; 3], src: [f32; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for c in 0..3 {
        dst[c] = dst[c] * (1.0 - a) + src[c] * a;
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
