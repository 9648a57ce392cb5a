use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use scene_visualizer::audio::{BAND_COUNT, ReactivitySample};
use scene_visualizer::config::VisualMode;
use scene_visualizer::frame::{FrameDriver, FrameTick};
use scene_visualizer::preview::PreviewEngine;
use scene_visualizer::scene::{SceneComposer, SceneTuning};
use scene_visualizer::theme::ThemeRegistry;

struct Args {
    out: PathBuf,
    mode: VisualMode,
    theme: String,
    width: usize,
    height: usize,
    frames: u32,
    fps: u32,
}

fn parse_args() -> Args {
    let mut out = PathBuf::from("snapshot.ppm");
    let mut mode = VisualMode::Rings;
    let mut theme = "aurora".to_string();
    let mut width = 320usize;
    let mut height = 180usize;
    let mut frames = 240u32;
    let mut fps = 60u32;

    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        let v = it.next();
        match (k.as_str(), v) {
            ("--out", Some(p)) => out = PathBuf::from(p),
            ("--mode", Some(m)) => {
                if let Some(parsed) = VisualMode::parse(&m) {
                    mode = parsed;
                }
            }
            ("--theme", Some(t)) => theme = t,
            ("--width", Some(v)) => {
                if let Ok(w) = v.parse::<usize>() {
                    width = w.clamp(1, 4096);
                }
            }
            ("--height", Some(v)) => {
                if let Ok(h) = v.parse::<usize>() {
                    height = h.clamp(1, 4096);
                }
            }
            ("--frames", Some(v)) => {
                if let Ok(n) = v.parse::<u32>() {
                    frames = n.clamp(1, 100_000);
                }
            }
            ("--fps", Some(v)) => {
                if let Ok(f) = v.parse::<u32>() {
                    fps = f.clamp(1, 240);
                }
            }
            _ => {}
        }
    }

    Args {
        out,
        mode,
        theme,
        width,
        height,
        frames,
        fps,
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let registry = ThemeRegistry::builtin();
    if !registry.contains(&args.theme) {
        eprintln!("note: theme '{}' not registered; using fallback colors", args.theme);
    }

    let mut composer = SceneComposer::new(args.mode, &args.theme, &registry, SceneTuning::default());
    let mut driver = FrameDriver::new();
    let mut preview = PreviewEngine::new();
    preview.resize(args.width, args.height);

    let dt = 1.0 / args.fps as f32;
    let total = args.frames as f32 * dt;
    for i in 0..args.frames {
        let elapsed = i as f32 * dt;
        let sample = ramp_sample(elapsed, total);
        composer.compose();
        composer.frame(FrameTick { elapsed, dt }, &sample, &mut driver);
    }
    if !composer.omitted().is_empty() {
        bail!("scene failed to mount {} layer(s)", composer.omitted().len());
    }

    preview.render(composer.nodes());
    write_ppm(&args.out, args.width, args.height, preview.pixels())
        .with_context(|| format!("write {}", args.out.display()))?;

    println!("wrote: {}", args.out.display());
    println!(
        "mode={} theme={} size={}x{} frames_driven={} scene_time={:.2}s",
        args.mode.label(),
        args.theme,
        args.width,
        args.height,
        args.frames,
        total
    );
    Ok(())
}

/// Deterministic stand-in for the live analyzer: the scalar ramps 0 -> 1
/// over the run and the bands carry a slow comb that sweeps across segments.
fn ramp_sample(t: f32, total: f32) -> ReactivitySample {
    let scalar = (t / total.max(1e-3)).clamp(0.0, 1.0);
    let mut bands = [0.0f32; BAND_COUNT];
    for (i, b) in bands.iter_mut().enumerate() {
        let phase = t * 2.0 - i as f32 * 0.35;
        *b = ((0.5 + 0.5 * phase.sin()) * scalar).clamp(0.0, 1.0);
    }
    ReactivitySample {
        scalar,
        bands,
        timestamp: t,
    }
}

fn write_ppm(path: &Path, width: usize, height: usize, rgba: &[u8]) -> Result<()> {
    if rgba.len() < width * height * 4 {
        bail!(
            "pixel buffer too small (need {}, got {})",
            width * height * 4,
            rgba.len()
        );
    }
    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    write!(out, "P6\n{width} {height}\n255\n")?;
    for px in rgba.chunks_exact(4).take(width * height) {
        out.write_all(&px[..3])?;
    }
    out.flush()?;
    Ok(())
}
