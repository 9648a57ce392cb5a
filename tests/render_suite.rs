use scene_visualizer::audio::{BAND_COUNT, ReactivitySample};
use scene_visualizer::config::VisualMode;
use scene_visualizer::frame::{FrameDriver, FrameTick};
use scene_visualizer::preview::PreviewEngine;
use scene_visualizer::render::{AsciiRenderer, Frame, HalfBlockRenderer, Renderer};
use scene_visualizer::scene::{SceneComposer, SceneTuning};
use scene_visualizer::theme::ThemeRegistry;

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 255;
    }
    buf
}

/// Build a gradient pixel buffer (varies across x).
fn gradient_pixels(w: usize, h: usize) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            let t = (x as f32 / w.max(1) as f32 * 255.0) as u8;
            buf[i] = t;
            buf[i + 1] = 128;
            buf[i + 2] = 255 - t;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        hud: "Mode: rings | FPS: 60.0",
        hud_rows: 1,
        overlay: None,
        sync_updates: sync,
    }
}

fn driven_composer(mode: VisualMode, sample: &ReactivitySample) -> SceneComposer {
    let registry = ThemeRegistry::builtin();
    let mut composer = SceneComposer::new(mode, "aurora", &registry, SceneTuning::default());
    composer.compose();
    let mut driver = FrameDriver::new();
    composer.frame(
        FrameTick {
            elapsed: 1.0,
            dt: 1.0 / 60.0,
        },
        sample,
        &mut driver,
    );
    composer
}

// ── ASCII renderer ──────────────────────────────────────────────────────────

#[test]
fn ascii_renders_solid_frame() {
    let cols = 10u16;
    let rows = 5u16;
    let pixels = solid_pixels(cols as usize, rows as usize, 200, 200, 200);
    let frame = make_frame(cols, rows, cols as usize, rows as usize, &pixels, false);
    let mut out = Vec::new();
    let mut renderer = AsciiRenderer::new();
    renderer.render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[H"), "missing home cursor");
    assert!(s.contains("\x1b[?7l"), "missing autowrap-off");
    assert!(s.contains("\x1b[?7h"), "missing autowrap-on");
    // Should have FG color escapes for 200,200,200
    assert!(s.contains("38;2;200;200;200"), "missing FG color");
    // HUD should be present
    assert!(s.contains("Mode: rings"), "HUD text missing");
}

#[test]
fn ascii_name() {
    assert_eq!(AsciiRenderer::new().name(), "ascii");
}

#[test]
fn ascii_skips_zero_size() {
    let pixels = solid_pixels(1, 1, 0, 0, 0);
    let frame = make_frame(0, 0, 0, 0, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for zero-size frame");
}

#[test]
fn ascii_emits_no_color_for_near_black_cells() {
    let cols = 6u16;
    let rows = 3u16;
    let pixels = solid_pixels(cols as usize, rows as usize, 2, 2, 2);
    let frame = make_frame(cols, rows, cols as usize, rows as usize, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(!s.contains("38;2;"), "near-black cells should skip FG escapes");
}

// ── HalfBlock renderer ─────────────────────────────────────────────────────

#[test]
fn halfblock_renders_gradient_frame() {
    let cols = 8u16;
    let rows = 4u16;
    let pw = cols as usize;
    let ph = (rows as usize) * 2;
    let pixels = gradient_pixels(pw, ph);
    let frame = make_frame(cols, rows, pw, ph, &pixels, true);
    let mut out = Vec::new();
    let mut renderer = HalfBlockRenderer::new();
    renderer.render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[?2026h"), "missing sync-begin");
    assert!(s.contains("\x1b[?2026l"), "missing sync-end");
    // Should use upper-half-block character
    assert!(s.contains("\u{2580}"), "missing half-block char");
    // Should have both FG and BG colors
    assert!(s.contains("38;2;"), "missing FG escape");
    assert!(s.contains("48;2;"), "missing BG escape");
}

#[test]
fn halfblock_name() {
    assert_eq!(HalfBlockRenderer::new().name(), "halfblock");
}

#[test]
fn halfblock_skips_dimension_mismatch() {
    // pixel_height should be visual_rows*2, but give visual_rows*1
    let cols = 4u16;
    let rows = 4u16;
    let pixels = solid_pixels(4, 4, 100, 100, 100);
    let frame = make_frame(cols, rows, 4, 4, &pixels, false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for dimension mismatch");
}

#[test]
fn halfblock_resets_color_cache_each_frame() {
    let cols = 4u16;
    let rows = 2u16;
    let pw = 4;
    let ph = 4;

    // Frame 1: red
    let pixels1 = solid_pixels(pw, ph, 255, 0, 0);
    let frame1 = make_frame(cols, rows, pw, ph, &pixels1, false);
    let mut out1 = Vec::new();
    let mut renderer = HalfBlockRenderer::new();
    renderer.render(&frame1, &mut out1).unwrap();
    let s1 = String::from_utf8_lossy(&out1);
    assert!(s1.contains("38;2;255;0;0"), "first frame missing red FG");

    // Frame 2: blue - color cache should reset so new color is emitted
    let pixels2 = solid_pixels(pw, ph, 0, 0, 255);
    let frame2 = make_frame(cols, rows, pw, ph, &pixels2, false);
    let mut out2 = Vec::new();
    renderer.render(&frame2, &mut out2).unwrap();
    let s2 = String::from_utf8_lossy(&out2);
    assert!(s2.contains("38;2;0;0;255"), "second frame missing blue FG");
}

// ── Overlay rendering ───────────────────────────────────────────────────────

#[test]
fn ascii_renders_overlay_popup() {
    let cols = 40u16;
    let rows = 20u16;
    let pixels = solid_pixels(cols as usize, rows as usize, 50, 50, 50);
    let mut frame = make_frame(cols, rows, cols as usize, rows as usize, &pixels, false);
    frame.term_rows = rows + 2;
    frame.overlay = Some("Test Overlay\nSecond line");
    let mut out = Vec::new();
    let mut renderer = AsciiRenderer::new();
    renderer.render(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("Test Overlay"), "overlay text missing");
    assert!(s.contains("Second line"), "overlay body missing");
}

// ── Preview engine ──────────────────────────────────────────────────────────

#[test]
fn preview_fills_rgba_buffer_from_scene() {
    let sample = ReactivitySample {
        scalar: 0.8,
        bands: [0.5; BAND_COUNT],
        timestamp: 1.0,
    };
    let composer = driven_composer(VisualMode::Rings, &sample);

    let mut preview = PreviewEngine::new();
    preview.resize(64, 64);
    preview.render(composer.nodes());

    let pixels = preview.pixels();
    assert_eq!(pixels.len(), 64 * 64 * 4);
    assert!(
        pixels.chunks_exact(4).any(|px| px[0] > 0 || px[1] > 0 || px[2] > 0),
        "composed scene should light up at least one pixel"
    );
    assert!(
        pixels.chunks_exact(4).all(|px| px[3] == 255),
        "preview output is opaque"
    );
}

#[test]
fn preview_zero_size_is_a_noop() {
    let sample = ReactivitySample::SILENT;
    let composer = driven_composer(VisualMode::Rings, &sample);
    let mut preview = PreviewEngine::new();
    preview.render(composer.nodes());
    assert!(preview.pixels().is_empty());
}

#[test]
fn preview_spectrum_bars_respond_to_band_level() {
    let silent = ReactivitySample::SILENT;
    let mut loud = ReactivitySample::SILENT;
    loud.bands = [1.0; BAND_COUNT];
    loud.timestamp = 1.0;

    let quiet_scene = driven_composer(VisualMode::Spectrum, &silent);
    let loud_scene = driven_composer(VisualMode::Spectrum, &loud);

    let mut preview = PreviewEngine::new();
    preview.resize(96, 54);
    preview.render(quiet_scene.nodes());
    let quiet_sum: u64 = preview.pixels().iter().map(|&b| b as u64).sum();
    preview.render(loud_scene.nodes());
    let loud_sum: u64 = preview.pixels().iter().map(|&b| b as u64).sum();

    assert!(
        loud_sum > quiet_sum,
        "full-level bands should brighten the frame (quiet={quiet_sum}, loud={loud_sum})"
    );
}
