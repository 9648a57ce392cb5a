use scene_visualizer::config::{Quality, RendererMode, VisualMode};
use scene_visualizer::prefs::{AppPrefs, PrefsError};
use scene_visualizer::theme::{ColorTheme, Rgb, ThemeError, ThemeManifest, ThemeRegistry};
use scene_visualizer::tracks::{DEMO_TRACKS, TrackSynth, composition_seconds, default_track, find};

// ── Theme manifests ─────────────────────────────────────────────────────────

#[test]
fn theme_manifest_parses() {
    let text = r#"
        # palette for deep-sea sessions
        name=Ocean Drift
        colors.primary=#0a84ff
        colors.secondary=1b3a6b
        colors.tertiary=#9AE8FF
    "#;

    let manifest = ThemeManifest::parse(text).expect("theme parse should succeed");
    assert_eq!(manifest.name, "Ocean Drift");
    assert_eq!(manifest.colors.primary, Rgb::new(0x0a, 0x84, 0xff));
    assert_eq!(manifest.colors.secondary, Rgb::new(0x1b, 0x3a, 0x6b));
    assert_eq!(manifest.colors.tertiary, Rgb::new(0x9a, 0xe8, 0xff));
}

#[test]
fn theme_manifest_requires_every_field() {
    let text = "colors.primary=#ffffff\ncolors.secondary=#000000\ncolors.tertiary=#808080";
    let err = ThemeManifest::parse(text).expect_err("missing name should fail");
    assert!(matches!(err, ThemeError::MissingField("name")));

    let text = "name=Partial\ncolors.primary=#ffffff\ncolors.secondary=#000000";
    let err = ThemeManifest::parse(text).expect_err("missing tertiary should fail");
    assert!(matches!(err, ThemeError::MissingField("colors.tertiary")));
}

#[test]
fn theme_manifest_rejects_bad_hex() {
    let text = "name=Bad\ncolors.primary=#12345\ncolors.secondary=#000000\ncolors.tertiary=#ffffff";
    let err = ThemeManifest::parse(text).expect_err("short hex should fail");
    assert!(matches!(err, ThemeError::Parse { line: 2, .. }));

    let text = "name=Bad\ncolors.primary=#gggggg\ncolors.secondary=#000000\ncolors.tertiary=#ffffff";
    let err = ThemeManifest::parse(text).expect_err("non-hex digits should fail");
    assert!(matches!(err, ThemeError::Parse { line: 2, .. }));
}

#[test]
fn theme_manifest_rejects_duplicate_and_unknown_keys() {
    let text = "name=Twice\nname=Again\ncolors.primary=#ffffff\ncolors.secondary=#000000\ncolors.tertiary=#808080";
    let err = ThemeManifest::parse(text).expect_err("duplicate name should fail");
    assert!(matches!(err, ThemeError::Parse { line: 2, .. }));

    let text = "name=Extra\nglitter=yes";
    let err = ThemeManifest::parse(text).expect_err("unknown key should fail");
    assert!(matches!(err, ThemeError::Parse { line: 2, .. }));

    let text = "name=Broken\nthis line has no equals sign";
    let err = ThemeManifest::parse(text).expect_err("non key=value line should fail");
    assert!(matches!(err, ThemeError::Parse { line: 2, .. }));
}

#[test]
fn theme_manifest_rejects_blank_name() {
    let text = "name=   \ncolors.primary=#ffffff\ncolors.secondary=#000000\ncolors.tertiary=#808080";
    let err = ThemeManifest::parse(text).expect_err("blank name should fail");
    assert!(matches!(err, ThemeError::InvalidValue { field: "name", .. }));
}

#[test]
fn theme_manifest_round_trips_text() {
    let manifest = ThemeManifest {
        name: "Roundtrip".to_string(),
        colors: ColorTheme {
            primary: Rgb::new(0x12, 0x34, 0x56),
            secondary: Rgb::new(0xab, 0xcd, 0xef),
            tertiary: Rgb::new(0x00, 0xff, 0x7f),
        },
    };

    let parsed = ThemeManifest::parse(&manifest.to_text()).expect("reparse should succeed");
    assert_eq!(parsed, manifest);
}

// ── Colors ──────────────────────────────────────────────────────────────────

#[test]
fn rgb_parse_hex_accepts_both_forms() {
    assert_eq!(Rgb::parse_hex("#a1b2c3"), Some(Rgb::new(0xa1, 0xb2, 0xc3)));
    assert_eq!(Rgb::parse_hex("A1B2C3"), Some(Rgb::new(0xa1, 0xb2, 0xc3)));
    assert_eq!(Rgb::parse_hex(" #ffffff "), Some(Rgb::new(255, 255, 255)));

    assert_eq!(Rgb::parse_hex("#fff"), None);
    assert_eq!(Rgb::parse_hex("zzzzzz"), None);
    assert_eq!(Rgb::parse_hex(""), None);
}

#[test]
fn rgb_display_and_unit_conversion() {
    assert_eq!(Rgb::new(1, 2, 255).to_string(), "#0102ff");
    assert_eq!(Rgb::new(255, 0, 0).to_unit(), [1.0, 0.0, 0.0]);
    assert_eq!(Rgb::new(0, 0, 0).to_unit(), [0.0, 0.0, 0.0]);
}

// ── Theme registry ──────────────────────────────────────────────────────────

#[test]
fn registry_resolves_builtins_and_falls_back() {
    let registry = ThemeRegistry::builtin();
    for id in ["aurora", "sunset", "neon", "glacier"] {
        assert!(registry.contains(id), "builtin theme {id} missing");
    }

    assert!(!registry.contains("missing"));
    assert_eq!(registry.resolve("missing"), ColorTheme::FALLBACK);
    assert_ne!(registry.resolve("aurora"), ColorTheme::FALLBACK);
    assert_eq!(
        registry.resolve("AURORA"),
        registry.resolve("aurora"),
        "lookups are case-insensitive"
    );
}

#[test]
fn registry_register_overrides_and_extends() {
    let mut registry = ThemeRegistry::builtin();
    let builtin_count = registry.ids().count();
    let custom = ColorTheme {
        primary: Rgb::new(1, 2, 3),
        secondary: Rgb::new(4, 5, 6),
        tertiary: Rgb::new(7, 8, 9),
    };

    registry.register("Custom", custom);
    assert!(registry.contains("custom"));
    assert_eq!(registry.resolve("CUSTOM"), custom);
    assert_eq!(registry.ids().count(), builtin_count + 1);

    registry.register("custom", ColorTheme::FALLBACK);
    assert_eq!(
        registry.ids().count(),
        builtin_count + 1,
        "re-register replaces in place"
    );
    assert_eq!(registry.resolve("custom"), ColorTheme::FALLBACK);
}

#[test]
fn registry_register_manifest_lowercases_the_id() {
    let mut registry = ThemeRegistry::builtin();
    let manifest = ThemeManifest {
        name: "Ocean Drift".to_string(),
        colors: ColorTheme::FALLBACK,
    };

    registry.register_manifest(&manifest);
    assert!(registry.contains("ocean drift"));
    assert!(registry.contains("OCEAN DRIFT"));
}

#[test]
fn registry_next_id_cycles_in_registration_order() {
    let registry = ThemeRegistry::builtin();
    assert_eq!(registry.next_id("aurora"), Some("sunset"));
    assert_eq!(registry.next_id("glacier"), Some("aurora"), "cycle wraps");
    assert_eq!(
        registry.next_id("unknown"),
        Some("aurora"),
        "unknown ids restart the cycle"
    );
}

// ── Demo tracks ─────────────────────────────────────────────────────────────

#[test]
fn demo_catalog_is_well_formed() {
    assert!(DEMO_TRACKS.len() >= 3);
    for t in DEMO_TRACKS {
        assert!(!t.id.is_empty());
        assert!(!t.title.is_empty());
        assert!(t.url.starts_with("demo://"), "track {} has a non-demo url", t.id);
        assert!(composition_seconds(t) > 10.0, "track {} is too short", t.id);
    }

    let mut ids: Vec<&str> = DEMO_TRACKS.iter().map(|t| t.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), DEMO_TRACKS.len(), "track ids must be unique");

    assert_eq!(find("pulse-120").map(|t| t.title), Some("Pulse Grid 120"));
    assert!(find("nope").is_none());
    assert_eq!(default_track().id, DEMO_TRACKS[0].id);
}

#[test]
fn track_synth_stays_in_range() {
    let mut synth = TrackSynth::new(default_track(), 44_100);
    let mut peak = 0.0f32;

    for _ in 0..44_100 * 3 {
        let s = synth.next_sample();
        assert!(s.is_finite());
        peak = peak.max(s.abs());
    }

    assert!(peak <= 1.0, "synth clipped past full scale: {peak}");
    assert!(peak > 0.05, "synth stayed silent");
}

#[test]
fn track_synth_loops_after_composition_ends() {
    let track = find("strobe-160").expect("catalog track should exist");
    let rate = 8_000u32;
    let total = (composition_seconds(track) * rate as f32) as usize + rate as usize;

    let mut synth = TrackSynth::new(track, rate);
    let mut buf = vec![0.0f32; total];
    synth.fill(&mut buf);

    let tail = &buf[buf.len() - rate as usize..];
    assert!(
        tail.iter().any(|s| s.abs() > 0.01),
        "synth went silent after looping"
    );
}

// ── Mode & renderer parsing ─────────────────────────────────────────────────

#[test]
fn visual_mode_parse_is_strict() {
    assert_eq!(VisualMode::parse("rings"), Some(VisualMode::Rings));
    assert_eq!(VisualMode::parse(" SPECTRUM "), Some(VisualMode::Spectrum));
    assert_eq!(VisualMode::parse(""), None);
    assert_eq!(VisualMode::parse("ring"), None);

    for mode in VisualMode::all() {
        assert_eq!(VisualMode::parse(mode.label()), Some(mode));
    }

    assert_eq!(VisualMode::Rings.next(), VisualMode::Spectrum);
    assert_eq!(VisualMode::Spectrum.next(), VisualMode::Rings);
}

#[test]
fn renderer_mode_parse_accepts_aliases() {
    assert_eq!(RendererMode::parse("auto"), Some(RendererMode::Auto));
    for alias in ["ascii", "ansi", "text"] {
        assert_eq!(RendererMode::parse(alias), Some(RendererMode::Ascii));
    }
    for alias in ["half-block", "halfblock", "half_block", "hb"] {
        assert_eq!(RendererMode::parse(alias), Some(RendererMode::HalfBlock));
    }
    assert_eq!(RendererMode::parse("gpu"), None);

    // Auto resolves at startup, so the runtime cycle only visits the two
    // concrete renderers.
    assert_eq!(RendererMode::Auto.next(), RendererMode::HalfBlock);
    assert_eq!(RendererMode::HalfBlock.next(), RendererMode::Ascii);
    assert_eq!(RendererMode::Ascii.next(), RendererMode::HalfBlock);
}

#[test]
fn quality_sets_fog_step_counts() {
    assert_eq!(Quality::High.fog_march_steps(), 24);
    assert_eq!(Quality::Balanced.fog_march_steps(), 16);
    assert_eq!(Quality::Fast.fog_march_steps(), 8);

    for q in [Quality::High, Quality::Balanced, Quality::Fast] {
        let steps = q.fog_march_steps();
        assert!((1..=128).contains(&steps), "{} step count out of range", q.label());
    }
}

// ── Session prefs ───────────────────────────────────────────────────────────

#[test]
fn prefs_parse_reads_known_keys() {
    let text = r#"
        # scene_visualizer runtime prefs v1
        mode=spectrum
        theme=Sunset
        renderer=half-block
        gain=2.250
        future_key=ignored
    "#;

    let prefs = AppPrefs::parse(text).expect("prefs parse should succeed");
    assert_eq!(prefs.mode, Some(VisualMode::Spectrum));
    assert_eq!(prefs.theme.as_deref(), Some("sunset"));
    assert_eq!(prefs.renderer, Some(RendererMode::HalfBlock));
    assert_eq!(prefs.gain, Some(2.25));
}

#[test]
fn prefs_parse_defaults_to_empty() {
    let prefs = AppPrefs::parse("").expect("empty prefs should parse");
    assert_eq!(prefs, AppPrefs::default());
    assert!(prefs.mode.is_none());
    assert!(prefs.gain.is_none());
}

#[test]
fn prefs_parse_reports_line_numbers() {
    let err = AppPrefs::parse("mode=rings\ngain=loud").expect_err("bad gain must fail");
    assert!(matches!(err, PrefsError::Parse { line: 2, .. }));

    let err = AppPrefs::parse("mode=disco").expect_err("unknown mode must fail");
    assert!(matches!(err, PrefsError::Parse { line: 1, .. }));
    assert!(err.to_string().contains("disco"));

    let err = AppPrefs::parse("not a key value line").expect_err("stray line must fail");
    assert!(matches!(err, PrefsError::Parse { line: 1, .. }));
}

#[test]
fn prefs_gain_is_clamped_on_parse() {
    let prefs = AppPrefs::parse("gain=99").expect("prefs parse should succeed");
    assert_eq!(prefs.gain, Some(8.0));

    let prefs = AppPrefs::parse("gain=-3").expect("prefs parse should succeed");
    assert_eq!(prefs.gain, Some(0.0));

    let err = AppPrefs::parse("gain=inf").expect_err("non-finite gain must fail");
    assert!(matches!(err, PrefsError::Parse { line: 1, .. }));
}

#[test]
fn prefs_round_trip_through_text() {
    let prefs = AppPrefs {
        mode: Some(VisualMode::Spectrum),
        theme: Some("glacier".to_string()),
        renderer: Some(RendererMode::Ascii),
        gain: Some(1.5),
    };
    let parsed = AppPrefs::parse(&prefs.to_text()).expect("round-trip parse should succeed");
    assert_eq!(parsed, prefs);

    // Absent fields stay absent instead of acquiring defaults.
    let sparse = AppPrefs {
        theme: Some("neon".to_string()),
        ..AppPrefs::default()
    };
    let parsed = AppPrefs::parse(&sparse.to_text()).expect("sparse round-trip should succeed");
    assert_eq!(parsed, sparse);
}

#[test]
fn prefs_save_and_load_round_trip() {
    let dir = std::env::temp_dir().join(format!("sceneviz_prefs_{}", std::process::id()));
    let path = dir.join("nested").join("prefs.txt");

    let prefs = AppPrefs {
        mode: Some(VisualMode::Rings),
        theme: Some("sunset".to_string()),
        renderer: Some(RendererMode::HalfBlock),
        gain: Some(0.5),
    };
    prefs.save(Some(&path)).expect("save should succeed");
    let loaded = AppPrefs::load(Some(&path)).expect("load should succeed");
    assert_eq!(loaded, prefs);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn prefs_load_tolerates_missing_file() {
    let path = std::env::temp_dir().join("sceneviz_prefs_missing").join("nope.txt");
    let loaded = AppPrefs::load(Some(&path)).expect("missing file should load defaults");
    assert_eq!(loaded, AppPrefs::default());

    let loaded = AppPrefs::load(None).expect("no path should load defaults");
    assert_eq!(loaded, AppPrefs::default());
}
