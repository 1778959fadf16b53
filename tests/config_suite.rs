use clap::Parser;
use milky_viz::config::{
    ChaserLine, ChaserSettings, Config, ConfigError, TunnelSettings, VisualConfig,
};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(std::iter::once("milky-viz").chain(args.iter().copied()))
}

// ── CLI ─────────────────────────────────────────────────────────────────────

#[test]
fn cli_defaults_match_the_core_defaults() {
    let cfg = parse(&["--seed", "3"]);
    let vcfg = cfg.visual_config(44_100);
    let defaults = VisualConfig::default();
    assert_eq!(vcfg.width, defaults.width);
    assert_eq!(vcfg.height, defaults.height);
    assert_eq!(vcfg.bit_depth, defaults.bit_depth);
    assert_eq!(vcfg.speed, defaults.speed);
    assert_eq!(vcfg.min_render_interval_ms, defaults.min_render_interval_ms);
    assert_eq!(vcfg.chaser, ChaserSettings::default());
    assert!(vcfg.tunnel.is_none());
    assert!(cfg.sync_updates);
    assert!(vcfg.validate().is_ok());
}

#[test]
fn cli_flags_reach_the_visual_config() {
    let cfg = parse(&[
        "--width",
        "200",
        "--height",
        "100",
        "--bit-depth",
        "16",
        "--chaser-count",
        "4",
        "--chaser-line",
        "wu",
        "--seed",
        "77",
        "--tunnel",
        "--sync-updates",
        "false",
    ]);
    assert!(!cfg.sync_updates);

    let vcfg = cfg.visual_config(48_000);
    assert_eq!((vcfg.width, vcfg.height), (200, 100));
    assert_eq!(vcfg.bit_depth, 16);
    assert_eq!(vcfg.sample_rate, 48_000);
    assert_eq!(vcfg.seed, 77);
    assert_eq!(vcfg.chaser.count, 4);
    assert_eq!(vcfg.chaser.line, ChaserLine::Wu);
    assert_eq!(vcfg.tunnel, Some(TunnelSettings::default()));
    assert_eq!(vcfg.frame_len(), 200 * 100 * 4);
}

#[test]
fn chaser_line_aliases() {
    assert_eq!(parse(&["--chaser-line", "gupta"]).chaser_line, ChaserLine::GuptaSproull);
    assert_eq!(
        parse(&["--chaser-line", "gupta-sproull"]).chaser_line,
        ChaserLine::GuptaSproull
    );
    assert_eq!(parse(&["--chaser-line", "xiaolin-wu"]).chaser_line, ChaserLine::Wu);
    assert!(Config::try_parse_from(["milky-viz", "--chaser-line", "dda"]).is_err());
}

#[test]
fn short_chunks_lower_the_minimum() {
    let vcfg = parse(&["--chunk-len", "512", "--seed", "1"]).visual_config(44_100);
    assert_eq!(vcfg.chunk_len, 512);
    assert_eq!(vcfg.min_chunk_len, 512);

    let vcfg = parse(&["--chunk-len", "4096", "--seed", "1"]).visual_config(44_100);
    assert_eq!(vcfg.min_chunk_len, 1024);
}

// ── Validation ──────────────────────────────────────────────────────────────

#[test]
fn validate_rejects_broken_configs() {
    let base = VisualConfig::default();
    let cases = [
        (
            VisualConfig { height: 0, ..base.clone() },
            ConfigError::EmptyCanvas { width: 320, height: 0 },
        ),
        (
            VisualConfig { chunk_len: 3, ..base.clone() },
            ConfigError::ChunkTooShort(3),
        ),
        (
            VisualConfig { sample_rate: 0, ..base.clone() },
            ConfigError::ZeroSampleRate,
        ),
        (
            VisualConfig { palette_transition_steps: 0, ..base.clone() },
            ConfigError::ZeroTransitionSteps,
        ),
        (
            VisualConfig { zoom: -1.0, ..base.clone() },
            ConfigError::BadZoom(-1.0),
        ),
        (
            VisualConfig {
                tunnel: Some(TunnelSettings { thickness: 0, ..TunnelSettings::default() }),
                ..base.clone()
            },
            ConfigError::BadTunnelThickness(0),
        ),
    ];
    for (cfg, expected) in cases {
        assert_eq!(cfg.validate(), Err(expected));
    }
}

#[test]
fn nan_zoom_is_rejected() {
    let cfg = VisualConfig {
        zoom: f32::NAN,
        ..VisualConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::BadZoom(_))));
}
