use milky_viz::config::{ConfigError, TunnelSettings, VisualConfig};
use milky_viz::exchange::{FrameExchange, DEFAULT_SLOTS};
use milky_viz::pipeline::Pipeline;
use milky_viz::visual::{ComposeError, FrameComposer, PassKind, INITIAL_SPEED_SCALAR};

fn small_config() -> VisualConfig {
    VisualConfig {
        width: 64,
        height: 48,
        seed: 1,
        ..VisualConfig::default()
    }
}

fn silence() -> Vec<u8> {
    vec![128u8; 1024]
}

fn kick() -> Vec<u8> {
    (0..1024)
        .map(|i| if (i / 128) % 2 == 0 { 216 } else { 40 })
        .collect()
}

fn has_non_black(buf: &[u8]) -> bool {
    buf.chunks_exact(4).any(|p| p[0] != 0 || p[1] != 0 || p[2] != 0)
}

// ── Rate gate ───────────────────────────────────────────────────────────────

#[test]
fn first_chunk_only_arms_the_timer() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    assert!(p.on_audio_chunk(&silence(), 0).is_none());
    assert!(p.on_audio_chunk(&silence(), 20).is_some());
}

#[test]
fn short_chunks_are_ignored() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    assert!(p.on_audio_chunk(&silence(), 0).is_none());
    assert!(p.on_audio_chunk(&[128u8; 512], 40).is_none());
    assert_eq!(p.composer().pass_count(), 0);
}

#[test]
fn chunks_inside_the_interval_are_skipped() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    p.on_audio_chunk(&silence(), 0);
    assert!(p.on_audio_chunk(&silence(), 10).is_none());
    assert!(p.on_audio_chunk(&silence(), 16).is_some());
    assert!(p.on_audio_chunk(&silence(), 20).is_none());
}

// ── Composition cadence ─────────────────────────────────────────────────────

#[test]
fn passes_alternate_between_compose_and_republish() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    p.on_audio_chunk(&silence(), 0);

    let first = p.on_audio_chunk(&silence(), 20).unwrap();
    assert!(first.pass.is_full());
    assert_eq!(first.spectrum.len(), 512);
    assert!(has_non_black(p.frame()));
    assert_eq!(p.composer().speed_scalar(), INITIAL_SPEED_SCALAR);

    let second = p.on_audio_chunk(&silence(), 40).unwrap();
    assert_eq!(second.pass, PassKind::Republished);
    assert_eq!(p.frame(), p.composer().retained());

    let third = p.on_audio_chunk(&silence(), 60).unwrap();
    assert!(third.pass.is_full());
    let expected = INITIAL_SPEED_SCALAR + small_config().speed * 2.0;
    assert!((p.composer().speed_scalar() - expected).abs() < 1e-6);
}

#[test]
fn silence_keeps_a_single_palette_and_no_spikes() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    let mut now = 0;
    for _ in 0..50 {
        if let Some(r) = p.on_audio_chunk(&silence(), now) {
            assert!(!r.spike);
            assert!(r.spectrum.iter().all(|&b| b == 0));
        }
        now += 20;
    }
    assert_eq!(p.spike_count(), 0);
    assert_eq!(p.palette_generation(), 1);
}

#[test]
fn a_kick_after_silence_spikes_once() {
    let mut p = Pipeline::new(&small_config(), None).unwrap();
    let mut now = 0;
    // One arming chunk, then ten quiet passes.
    for _ in 0..11 {
        p.on_audio_chunk(&silence(), now);
        now += 20;
    }
    assert_eq!(p.composer().pass_count(), 10);

    let first = p.on_audio_chunk(&kick(), now).unwrap();
    assert!(first.pass.is_full());
    assert!(first.spike);

    for _ in 0..10 {
        now += 20;
        p.on_audio_chunk(&kick(), now);
    }
    assert_eq!(p.spike_count(), 1);
    assert_eq!(p.palette_generation(), 1, "cooldown still running");
}

#[test]
fn skipped_passes_leave_state_alone() {
    let mut c = FrameComposer::new(&small_config()).unwrap();
    assert_eq!(c.render(&[], &[1, 2], 0), PassKind::Skipped);
    assert_eq!(c.render(&silence(), &[], 0), PassKind::Skipped);
    assert_eq!(c.pass_count(), 0);
    assert!(!PassKind::Skipped.spike());
}

// ── Buffers ─────────────────────────────────────────────────────────────────

#[test]
fn resize_reallocates_every_buffer() {
    let mut c = FrameComposer::new(&small_config()).unwrap();
    c.render(&silence(), &[0; 512], 0);
    c.resize(32, 24).unwrap();
    assert_eq!(c.frame().len(), 32 * 24 * 4);
    assert_eq!(c.retained().len(), 32 * 24 * 4);
    assert!(!has_non_black(c.retained()));

    c.render(&silence(), &[0; 512], 20);
    c.render(&silence(), &[0; 512], 40);
    assert_eq!((c.width(), c.height()), (32, 24));
    assert!(has_non_black(c.frame()));
}

#[test]
fn resize_to_nothing_is_an_error() {
    let mut c = FrameComposer::new(&small_config()).unwrap();
    assert!(matches!(
        c.resize(0, 10),
        Err(ComposeError::Config(ConfigError::EmptyCanvas { width: 0, height: 10 }))
    ));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = VisualConfig {
        width: 0,
        ..small_config()
    };
    assert!(matches!(
        FrameComposer::new(&cfg),
        Err(ComposeError::Config(ConfigError::EmptyCanvas { .. }))
    ));
}

#[test]
fn tunnel_joins_the_effect_chain() {
    let cfg = VisualConfig {
        tunnel: Some(TunnelSettings::default()),
        ..small_config()
    };
    let c = FrameComposer::new(&cfg).unwrap();
    assert_eq!(c.effect_names().collect::<Vec<_>>(), vec!["tunnel", "chasers"]);
}

#[test]
fn reduced_bit_depth_still_composes() {
    let cfg = VisualConfig {
        bit_depth: 8,
        ..small_config()
    };
    let mut p = Pipeline::new(&cfg, None).unwrap();
    p.on_audio_chunk(&silence(), 0);
    let r = p.on_audio_chunk(&kick(), 20).unwrap();
    assert!(r.pass.is_full());
    assert!(has_non_black(p.frame()));
}

// ── Publishing ──────────────────────────────────────────────────────────────

#[test]
fn frames_flow_to_the_consumer() {
    let cfg = small_config();
    let (tx, mut rx, _shutdown) = FrameExchange::new(cfg.frame_len(), DEFAULT_SLOTS).unwrap();
    let mut p = Pipeline::new(&cfg, Some(tx)).unwrap();
    p.on_audio_chunk(&silence(), 0);

    let mut out = Vec::new();
    for (i, now) in [20u64, 40, 60].into_iter().enumerate() {
        let r = p.on_audio_chunk(&silence(), now).unwrap();
        assert_eq!(r.published, Some(i as u64));
        let info = rx.take_next_frame(&mut out).unwrap();
        assert_eq!(info.seq, i as u64);
        assert_eq!(out.as_slice(), p.frame());
    }
}

#[test]
fn a_stalled_display_drops_frames() {
    let cfg = small_config();
    let (tx, _rx, _shutdown) = FrameExchange::new(cfg.frame_len(), 2).unwrap();
    let mut p = Pipeline::new(&cfg, Some(tx)).unwrap();
    p.on_audio_chunk(&silence(), 0);
    for now in [20, 40, 60, 80] {
        p.on_audio_chunk(&silence(), now);
    }
    assert_eq!(p.dropped_frames(), 2);
}

#[test]
fn shutdown_is_visible_to_the_producer() {
    let cfg = small_config();
    let (tx, _rx, shutdown) = FrameExchange::new(cfg.frame_len(), 2).unwrap();
    let mut p = Pipeline::new(&cfg, Some(tx)).unwrap();
    assert!(!p.is_closed());
    shutdown.close();
    assert!(p.is_closed());
    p.on_audio_chunk(&silence(), 0);
    let r = p.on_audio_chunk(&silence(), 20).unwrap();
    assert_eq!(r.published, None);
}
