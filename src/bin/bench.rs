use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use milky_viz::config::{ChaserLine, TunnelSettings, VisualConfig};
use milky_viz::exchange::{FrameExchange, DEFAULT_SLOTS};
use milky_viz::pipeline::Pipeline;

struct Args {
    frames: usize,
    w: usize,
    h: usize,
    bit_depth: u8,
    chunk_len: usize,
    tunnel: bool,
    line: ChaserLine,
    seed: u64,
    ci_smoke: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 240,
        w: 320,
        h: 180,
        bit_depth: 32,
        chunk_len: 1024,
        tunnel: false,
        line: ChaserLine::Bresenham,
        seed: 42,
        ci_smoke: false,
        max_ms: 16.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--bit-depth", Some(x)) => {
                if let Ok(n) = x.parse::<u8>() {
                    args.bit_depth = n;
                }
                i += 2;
            }
            ("--chunk-len", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.chunk_len = n.max(4);
                }
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--line", Some("wu")) => {
                args.line = ChaserLine::Wu;
                i += 2;
            }
            ("--line", Some("gupta-sproull")) => {
                args.line = ChaserLine::GuptaSproull;
                i += 2;
            }
            ("--line", Some("bresenham")) => {
                args.line = ChaserLine::Bresenham;
                i += 2;
            }
            ("--tunnel", _) => {
                args.tunnel = true;
                i += 1;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }
    args
}

/// Low hum with a square-wave kick every half second of chunks.
fn synth_chunk(step: usize, len: usize, out: &mut Vec<u8>) {
    out.clear();
    let kick = step % 30 == 0;
    out.extend((0..len).map(|i| {
        let t = (step * len + i) as f32;
        let hum = (t * 0.013).sin() * 0.15 + (t * 0.071).sin() * 0.05;
        let s = if kick {
            if (i / 128) % 2 == 0 { 0.7 } else { -0.7 }
        } else {
            hum
        };
        (s * 128.0 + 128.0).clamp(0.0, 255.0) as u8
    }));
}

fn main() -> Result<()> {
    let args = parse_args();
    milky_viz::telemetry::init(None);
    let cfg = VisualConfig {
        width: args.w,
        height: args.h,
        bit_depth: args.bit_depth,
        chunk_len: args.chunk_len,
        min_chunk_len: args.chunk_len,
        tunnel: args.tunnel.then(TunnelSettings::default),
        seed: args.seed,
        chaser: milky_viz::config::ChaserSettings {
            line: args.line,
            ..Default::default()
        },
        ..VisualConfig::default()
    };
    cfg.validate()?;

    let (producer, mut consumer, shutdown) = FrameExchange::new(cfg.frame_len(), DEFAULT_SLOTS)?;
    let mut pipeline = Pipeline::new(&cfg, Some(producer))?;

    let display = thread::spawn(move || {
        let mut frame = Vec::new();
        let mut shown = 0u64;
        while consumer.take_next_frame(&mut frame).is_ok() {
            shown += 1;
        }
        shown
    });

    println!(
        "pipeline benchmark: frames={} size={}x{} bit_depth={} chunk={} tunnel={} line={:?}",
        args.frames, args.w, args.h, args.bit_depth, args.chunk_len, args.tunnel, args.line
    );

    let mut chunk = Vec::with_capacity(args.chunk_len);
    let mut full = Duration::ZERO;
    let mut full_passes = 0usize;
    let mut lit = 0usize;
    let mut now_ms = 0u64;

    // One extra chunk arms the rate gate.
    for step in 0..=args.frames {
        synth_chunk(step, args.chunk_len, &mut chunk);
        let start = Instant::now();
        let report = pipeline.on_audio_chunk(&chunk, now_ms);
        let elapsed = start.elapsed();
        now_ms += 17;

        if let Some(r) = report {
            if r.pass.is_full() {
                full += elapsed;
                full_passes += 1;
                if pipeline.frame().chunks_exact(4).any(|px| px[..3] != [0, 0, 0]) {
                    lit += 1;
                }
            }
        }
    }

    shutdown.close();
    let shown = display.join().unwrap_or(0);

    let ms = full.as_secs_f64() * 1000.0 / full_passes.max(1) as f64;
    println!(
        "full passes: {full_passes}  {ms:>8.3} ms/pass  lit={lit}  spikes={}  palettes={}  shown={shown}  dropped={}",
        pipeline.spike_count(),
        pipeline.palette_generation(),
        pipeline.dropped_frames(),
    );

    if args.ci_smoke {
        if lit == 0 || ms > args.max_ms {
            eprintln!("CI smoke: FAIL (lit={lit}, {ms:.3} ms/pass > {:.3}?)", args.max_ms);
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }
    Ok(())
}
