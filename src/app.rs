use crate::audio::AudioSystem;
use crate::config::{Config, RendererMode, VisualMode};
use crate::frame::{FrameClock, FrameDriver};
use crate::layer::FogParams;
use crate::prefs::{AppPrefs, prefs_storage_path};
use crate::preview::PreviewEngine;
use crate::render::{Frame, Renderer, make_renderer, resolve_renderer};
use crate::scene::{SceneComposer, SceneTuning};
use crate::terminal::TerminalGuard;
use crate::theme::{ThemeManifest, ThemeRegistry};
use crate::tracks;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let mut registry = ThemeRegistry::builtin();
    if let Some(path) = &cfg.theme_file {
        let manifest =
            ThemeManifest::load(path).with_context(|| format!("load theme manifest '{path}'"))?;
        registry.register_manifest(&manifest);
    }

    let prefs_path = prefs_storage_path();
    let prefs = match AppPrefs::load(prefs_path.as_deref()) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("ignoring saved prefs: {err}");
            AppPrefs::default()
        }
    };

    // CLI flags win over saved prefs; prefs win over the built-in defaults.
    let mut mode = cfg.mode.or(prefs.mode).unwrap_or(VisualMode::Rings);
    let mut theme_id = cfg
        .theme
        .clone()
        .or(prefs.theme.clone())
        .unwrap_or_else(|| "aurora".to_string())
        .to_ascii_lowercase();
    let mut renderer_mode =
        resolve_renderer(cfg.renderer.or(prefs.renderer).unwrap_or(RendererMode::Auto));
    let gain = cfg.gain.or(prefs.gain).unwrap_or(1.0).clamp(0.0, 8.0);

    let track = match cfg.track.as_deref() {
        Some(id) => tracks::find(id)
            .ok_or_else(|| anyhow::anyhow!("unknown track '{id}' (see --list-tracks)"))?,
        None => tracks::default_track(),
    };

    let audio = AudioSystem::new(cfg.source, cfg.device.as_deref(), track)
        .with_context(|| format!("start signal source ({})", cfg.source.label()))?;
    audio.set_gain(gain);

    let tuning = SceneTuning {
        fog: FogParams {
            march_steps: cfg.quality.fog_march_steps(),
            ..FogParams::default()
        },
        ..SceneTuning::default()
    };
    let mut composer = SceneComposer::new(mode, &theme_id, &registry, tuning);
    let mut clock = FrameClock::new();
    let mut driver = FrameDriver::new();
    let mut preview = PreviewEngine::new();

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer: Box<dyn Renderer> = make_renderer(renderer_mode);

    let mut last_size = TerminalGuard::size()?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut show_hud = true;
    let mut show_help = false;
    let mut fps = FpsCounter::new();
    let source_label = audio.source_label.clone();

    loop {
        let now = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    let old_renderer = renderer_mode;
                    let should_quit = handle_key(
                        k.code,
                        k.modifiers,
                        &registry,
                        &audio,
                        &mut mode,
                        &mut theme_id,
                        &mut renderer_mode,
                        &mut show_hud,
                        &mut show_help,
                    );
                    if should_quit {
                        let saved = AppPrefs {
                            mode: Some(mode),
                            theme: Some(theme_id.clone()),
                            renderer: Some(renderer_mode),
                            gain: Some(audio.gain()),
                        };
                        let _ = saved.save(prefs_path.as_deref());
                        return Ok(());
                    }
                    if renderer_mode != old_renderer {
                        renderer = make_renderer(renderer_mode);
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                }
                _ => {}
            }
        }

        // Size check once per frame (resize events can be missed in some
        // terminals).
        let sz = TerminalGuard::size()?;
        if sz != last_size {
            last_size = sz;
        }
        let (term_cols, term_rows) = last_size;

        composer.set_mode(mode);
        composer.set_theme(&theme_id, &registry);
        composer.compose();

        let tick = clock.tick(now);
        let sample = audio.snapshot();
        composer.frame(tick, &sample, &mut driver);

        let hud = if show_hud {
            build_hud(
                term_cols as usize,
                mode,
                &theme_id,
                registry.contains(&theme_id),
                &source_label,
                renderer.name(),
                fps.fps(),
                sample.scalar,
                audio.signal_age_ms(),
                audio.gain(),
                audio.is_paused(),
                composer.mounted_count(),
                composer.omitted().len(),
            )
        } else {
            String::new()
        };
        let hud_rows = hud_rows_for_text(term_rows, show_hud, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);

        let (px_w_mul, px_h_mul) = match renderer_mode {
            RendererMode::Ascii => (1usize, 1usize),
            _ => (1usize, 2usize),
        };
        let w = (term_cols as usize).saturating_mul(px_w_mul);
        let h = (visual_rows as usize).saturating_mul(px_h_mul);

        preview.resize(w, h);
        preview.render(composer.nodes());

        let overlay = if show_help {
            Some(help_popup_text())
        } else {
            None
        };

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: preview.pixels(),
            hud: &hud,
            hud_rows,
            overlay,
            sync_updates: cfg.sync_updates,
        };

        renderer.render(&frame, &mut out)?;
        fps.tick();

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    registry: &ThemeRegistry,
    audio: &AudioSystem,
    mode: &mut VisualMode,
    theme_id: &mut String,
    renderer_mode: &mut RendererMode,
    show_hud: &mut bool,
    show_help: &mut bool,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    match code {
        KeyCode::Esc => {
            if *show_help {
                *show_help = false;
                false
            } else {
                true
            }
        }
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Tab => {
            *mode = mode.next();
            false
        }
        KeyCode::Char('1') => {
            *mode = VisualMode::Rings;
            false
        }
        KeyCode::Char('2') => {
            *mode = VisualMode::Spectrum;
            false
        }
        KeyCode::Char('t') => {
            if let Some(next) = registry.next_id(theme_id) {
                *theme_id = next.to_string();
            }
            false
        }
        KeyCode::Char('T') => {
            let ids: Vec<&str> = registry.ids().collect();
            if !ids.is_empty() {
                let pos = ids.iter().position(|i| *i == theme_id).unwrap_or(0);
                *theme_id = ids[(pos + ids.len() - 1) % ids.len()].to_string();
            }
            false
        }
        KeyCode::Char(' ') => {
            audio.toggle_paused();
            false
        }
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('g') => {
            audio.set_gain((audio.gain() + 0.1).min(8.0));
            false
        }
        KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Char('G') => {
            audio.set_gain((audio.gain() - 0.1).max(0.0));
            false
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            *renderer_mode = renderer_mode.next();
            false
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            *show_hud = !*show_hud;
            false
        }
        KeyCode::Char('?') | KeyCode::Char('/') | KeyCode::Char('h') | KeyCode::Char('H')
        | KeyCode::F(1) => {
            *show_help = !*show_help;
            false
        }
        _ => false,
    }
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

#[allow(clippy::too_many_arguments)]
fn build_hud(
    cols: usize,
    mode: VisualMode,
    theme_id: &str,
    theme_known: bool,
    source_label: &str,
    renderer_name: &str,
    fps: f32,
    reactivity: f32,
    signal_age_ms: f32,
    gain: f32,
    paused: bool,
    mounted: usize,
    omitted: usize,
) -> String {
    let theme_note = if theme_known { "" } else { " (fallback)" };
    let omitted_note = if omitted > 0 {
        format!(", {omitted} omitted")
    } else {
        String::new()
    };

    let logical_lines = vec![
        format!(
            "Mode: {} | Theme: {}{} | Source: {} | Renderer: {} | FPS: {:>4.1}",
            mode.label(),
            theme_id,
            theme_note,
            source_label,
            renderer_name,
            fps,
        ),
        format!(
            "Reactivity: {} {:>4.2} | Signal age: {:>5.0} ms | Gain: {:>4.2} | Paused: {} | Layers: {}{}",
            reactivity_gauge(reactivity),
            reactivity,
            signal_age_ms,
            gain,
            if paused { "on" } else { "off" },
            mounted,
            omitted_note,
        ),
        "Keys: m/tab mode | 1/2 rings/spectrum | t/T theme | space pause | +/- gain | r renderer | i HUD | ?/h help | q quit"
            .to_string(),
    ];

    wrap_hud_lines(cols, &logical_lines).join("\n")
}

fn reactivity_gauge(level: f32) -> String {
    const WIDTH: usize = 10;
    let filled = (level.clamp(0.0, 1.0) * WIDTH as f32).round() as usize;
    let mut s = String::with_capacity(WIDTH + 2);
    s.push('[');
    for i in 0..WIDTH {
        s.push(if i < filled { '#' } else { '-' });
    }
    s.push(']');
    s
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        out.extend(hard_wrap_line(line, width));
    }
    out
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }

    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;
    for ch in line.chars() {
        cur.push(ch);
        cur_len += 1;
        if cur_len >= width {
            out.push(cur);
            cur = String::new();
            cur_len = 0;
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn help_popup_text() -> &'static str {
    "Scene Visualizer Hotkeys\n\
m or tab  cycle visualization mode\n\
1 / 2  rings / spectrum mode\n\
t / T  next / previous color theme\n\
space  pause or resume the signal source\n\
+ / -  reactivity gain up / down\n\
r  cycle renderer (half-block/ascii)\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
esc  close this help\n\
q  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
