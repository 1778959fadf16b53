use crate::audio::{AudioSystem, ChunkSink};
use crate::config::Config;
use crate::exchange::{FrameExchange, ShutdownHandle, DEFAULT_SLOTS};
use crate::pipeline::Pipeline;
use crate::render::{downsample_nearest, Frame, HalfBlockRenderer, Renderer};
use crate::telemetry;
use crate::terminal::{self, TerminalGuard};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::fmt::Write as _;
use std::io::{self, stdout, BufWriter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Counters the capture thread exposes to the status line.
#[derive(Default)]
struct LiveStats {
    spikes: AtomicU64,
    palettes: AtomicU64,
    dropped: AtomicU64,
}

struct LiveSink {
    pipeline: Pipeline,
    clock: Instant,
    shutdown: ShutdownHandle,
    stats: Arc<LiveStats>,
}

impl ChunkSink for LiveSink {
    fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        if self.shutdown.is_closed() {
            return false;
        }
        let now_ms = self.clock.elapsed().as_millis() as u64;
        if self.pipeline.on_audio_chunk(chunk, now_ms).is_some() {
            self.stats
                .spikes
                .store(self.pipeline.spike_count(), Ordering::Relaxed);
            self.stats
                .palettes
                .store(self.pipeline.palette_generation(), Ordering::Relaxed);
            self.stats
                .dropped
                .store(self.pipeline.dropped_frames(), Ordering::Relaxed);
        }
        !self.pipeline.is_closed()
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    telemetry::init(cfg.log_file.as_deref());

    let mut audio = AudioSystem::open(cfg.device.as_deref()).context("open audio input")?;
    let vcfg = cfg.visual_config(audio.sample_rate_hz);
    vcfg.validate().context("invalid visual configuration")?;

    // Every long-lived buffer exists before any thread starts.
    let (producer, mut consumer, shutdown) =
        FrameExchange::new(vcfg.frame_len(), DEFAULT_SLOTS).context("allocate frame exchange")?;
    let pipeline = Pipeline::new(&vcfg, Some(producer)).context("allocate frame composer")?;

    let (cols, rows) = crossterm::terminal::size().context("get terminal size")?;
    if rows < 2 || cols < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {cols}x{rows})"
        ));
    }

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(stdout());
    let mut renderer = HalfBlockRenderer::new();

    let input = {
        let shutdown = shutdown.clone();
        thread::Builder::new()
            .name("milky-input".into())
            .spawn(move || input_loop(&shutdown, poll_terminal))
            .context("spawn input thread")?
    };

    let stats = Arc::new(LiveStats::default());
    audio
        .start(
            vcfg.chunk_len,
            LiveSink {
                pipeline,
                clock: Instant::now(),
                shutdown: shutdown.clone(),
                stats: Arc::clone(&stats),
            },
        )
        .context("start audio capture")?;
    tracing::info!(renderer = renderer.name(), fps = cfg.fps, "display loop running");

    let result = display_loop(&cfg, &vcfg, &mut consumer, &mut renderer, &mut out, &stats);

    shutdown.close();
    drop(audio);
    match input.join() {
        Ok(r) => r?,
        Err(_) => tracing::warn!("input thread panicked"),
    }
    result
}

fn display_loop(
    cfg: &Config,
    vcfg: &crate::config::VisualConfig,
    consumer: &mut crate::exchange::FrameConsumer,
    renderer: &mut dyn Renderer,
    out: &mut BufWriter<std::io::Stdout>,
    stats: &LiveStats,
) -> anyhow::Result<()> {
    let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
    let mut canvas = Vec::with_capacity(vcfg.frame_len());
    let mut scaled = Vec::new();
    let mut hud = String::new();
    let mut fps = FpsCounter::new();
    let mut last_seq = None;

    loop {
        let frame_start = Instant::now();
        match consumer.take_next_frame_timeout(&mut canvas, target) {
            Ok(Some(info)) => last_seq = Some(info.seq),
            // Keep showing the last frame while audio is quiet.
            Ok(None) if canvas.is_empty() => continue,
            Ok(None) => {}
            Err(_) => break,
        }

        let (cols, rows) = crossterm::terminal::size()?;
        let (cols, visual_rows, px_h) = terminal::visual_geometry(cols, rows);
        downsample_nearest(&canvas, vcfg.width, vcfg.height, &mut scaled, cols as usize, px_h);

        hud.clear();
        let _ = write!(
            hud,
            "milky-viz | {:.0} fps | frame {} | spikes {} | palettes {} | dropped {} | q quit",
            fps.fps(),
            last_seq.unwrap_or(0),
            stats.spikes.load(Ordering::Relaxed),
            stats.palettes.load(Ordering::Relaxed),
            stats.dropped.load(Ordering::Relaxed),
        );

        let frame = Frame {
            term_cols: cols,
            visual_rows,
            pixel_width: cols as usize,
            pixel_height: px_h,
            pixels_rgba: &scaled,
            hud: &hud,
            hud_rows: terminal::HUD_ROWS,
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, out)?;
        fps.tick();

        let elapsed = frame_start.elapsed();
        if elapsed < target {
            thread::sleep(target - elapsed);
        }
    }
    Ok(())
}

/// Watches keys until quit or shutdown. The exchange is closed on every exit,
/// so a dead terminal also ends the display loop.
fn input_loop<E>(shutdown: &ShutdownHandle, mut next_event: E) -> anyhow::Result<()>
where
    E: FnMut(Duration) -> io::Result<Option<Event>>,
{
    let result = watch_keys(shutdown, &mut next_event);
    if let Err(err) = &result {
        tracing::error!(%err, "input thread failed; shutting down");
    }
    shutdown.close();
    result
}

fn watch_keys<E>(shutdown: &ShutdownHandle, next_event: &mut E) -> anyhow::Result<()>
where
    E: FnMut(Duration) -> io::Result<Option<Event>>,
{
    while !shutdown.is_closed() {
        let Some(Event::Key(k)) = next_event(Duration::from_millis(50))? else {
            continue;
        };
        if k.kind != KeyEventKind::Release && is_quit(k.code, k.modifiers) {
            tracing::info!("quit requested");
            return Ok(());
        }
    }
    Ok(())
}

fn poll_terminal(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

fn is_quit(code: KeyCode, mods: KeyModifiers) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }
    matches!(code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q'))
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
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
