pub mod bitdepth;
pub mod draw;
pub mod effects;
pub mod feedback;
pub mod palette;
pub mod transform;

use crate::analysis::{Detection, EnergyDetector, WaveformShaper};
use crate::config::{ConfigError, VisualConfig};
use effects::{ChaserField, Effect, EffectCtx, TunnelRing};
use palette::PaletteEngine;
use std::collections::TryReserveError;
use thiserror::Error;
use transform::Rotation;

/// Speed scalar before the first feedback pass.
pub const INITIAL_SPEED_SCALAR: f32 = 0.01;
const SCOPE_PASSES: [(f32, i32, i32); 2] = [(5.0, 0, 0), (0.0, 1, 0)];

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot allocate {bytes} bytes for the {what} buffer")]
    Alloc {
        what: &'static str,
        bytes: usize,
        #[source]
        source: TryReserveError,
    },
}

pub(crate) fn alloc_zeroed(what: &'static str, bytes: usize) -> Result<Vec<u8>, ComposeError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|source| ComposeError::Alloc { what, bytes, source })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassKind {
    /// Waveform or spectrum was empty; nothing changed.
    Skipped,
    /// Full synthesis pass.
    Composed(Detection),
    /// Every other pass republishes the retained frame.
    Republished,
}

impl PassKind {
    pub fn spike(&self) -> bool {
        matches!(self, Self::Composed(d) if d.spike)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Composed(_))
    }
}

/// Feedback compositor. Owns the displayed frame, the retained frame from the
/// previous full pass and a scratch buffer for the geometric stages.
pub struct FrameComposer {
    cfg: VisualConfig,
    w: usize,
    h: usize,

    // Buffers
    frame: Vec<u8>,
    prev: Vec<u8>,
    scratch: Vec<u8>,
    curve: Vec<f32>,

    shaper: WaveformShaper,
    detector: EnergyDetector,
    palette: PaletteEngine,
    rotation: Rotation,
    effects: Vec<Box<dyn Effect>>,

    passes: u64,
    primed: bool,
    speed_scalar: f32,
}

impl FrameComposer {
    pub fn new(cfg: &VisualConfig) -> Result<Self, ComposeError> {
        cfg.validate()?;
        let len = cfg.frame_len();

        let mut effects: Vec<Box<dyn Effect>> = Vec::new();
        if let Some(tunnel) = cfg.tunnel {
            effects.push(Box::new(TunnelRing::new(tunnel)));
        }
        effects.push(Box::new(ChaserField::new(cfg.chaser)));

        Ok(Self {
            w: cfg.width,
            h: cfg.height,
            frame: alloc_zeroed("frame", len)?,
            prev: alloc_zeroed("retained frame", len)?,
            scratch: alloc_zeroed("scratch", len)?,
            curve: Vec::with_capacity(cfg.chunk_len),
            shaper: WaveformShaper::new(cfg.volume_scale),
            detector: EnergyDetector::new(cfg.sample_rate),
            palette: PaletteEngine::new(
                cfg.seed,
                cfg.palette_transition_steps,
                cfg.palette_cooldown_ms,
            ),
            rotation: Rotation::new(cfg.seed.rotate_left(17)),
            effects,
            passes: 0,
            primed: false,
            speed_scalar: INITIAL_SPEED_SCALAR,
            cfg: cfg.clone(),
        })
    }

    /// Reallocates every buffer for a new canvas. The retained frame starts
    /// black, so stale pixels from the old geometry are never read.
    pub fn resize(&mut self, w: usize, h: usize) -> Result<(), ComposeError> {
        if (w, h) == (self.w, self.h) {
            return Ok(());
        }
        if w == 0 || h == 0 {
            return Err(ConfigError::EmptyCanvas { width: w, height: h }.into());
        }
        let len = w.saturating_mul(h).saturating_mul(4);
        self.frame = alloc_zeroed("frame", len)?;
        self.prev = alloc_zeroed("retained frame", len)?;
        self.scratch = alloc_zeroed("scratch", len)?;
        self.w = w;
        self.h = h;
        self.cfg.width = w;
        self.cfg.height = h;
        tracing::info!(w, h, "canvas resized");
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Frame kept from the last full pass.
    pub fn retained(&self) -> &[u8] {
        &self.prev
    }

    pub fn palette(&self) -> &PaletteEngine {
        &self.palette
    }

    pub fn detector(&self) -> &EnergyDetector {
        &self.detector
    }

    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    pub fn speed_scalar(&self) -> f32 {
        self.speed_scalar
    }

    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn effect_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.effects.iter().map(|e| e.name())
    }

    pub fn render(&mut self, waveform: &[u8], spectrum: &[u8], now_ms: u64) -> PassKind {
        if waveform.is_empty() || spectrum.is_empty() {
            tracing::warn!(
                waveform = waveform.len(),
                spectrum = spectrum.len(),
                "skipping render: empty input"
            );
            return PassKind::Skipped;
        }

        self.passes += 1;
        if self.passes % 2 == 0 {
            self.frame.copy_from_slice(&self.prev);
            return PassKind::Republished;
        }

        let (w, h) = (self.w, self.h);
        self.shaper.shape(waveform, &mut self.curve);

        if !self.primed {
            draw::clear_frame(&mut self.frame);
            draw::clear_frame(&mut self.prev);
            self.primed = true;
        } else {
            self.speed_scalar += self.cfg.speed * 2.0;
            feedback::blur_frame(&mut self.prev, feedback::DECAY);
            feedback::preserve_mass_fade(&mut self.prev);
            self.frame.copy_from_slice(&self.prev);
        }

        // Palette reacts to the spike seen on the previous full pass.
        let last_spike = self.detector.spike_detected();
        self.palette
            .apply_palette_to_canvas(&mut self.frame, last_spike, now_ms);

        let offset = self.shaper.average_offset();
        for (alpha, y_off, x_off) in SCOPE_PASSES {
            draw::draw_scope(&mut self.frame, w, h, &self.curve, offset, alpha, y_off, x_off);
        }

        let detection = self.detector.detect(waveform, spectrum);

        let ctx = EffectCtx {
            w,
            h,
            time: self.speed_scalar,
            speed: self.cfg.speed * self.cfg.chaser.speed_mul,
            spike: detection.spike,
            now_ms,
        };
        for effect in &mut self.effects {
            effect.render(&ctx, &mut self.frame);
        }

        if self.cfg.bit_depth < 32 {
            bitdepth::reduce_bit_depth(&mut self.frame, self.cfg.bit_depth);
        }
        self.rotation.rotate(&mut self.frame, &mut self.scratch, w, h);
        transform::scale(&mut self.frame, &mut self.scratch, w, h, self.cfg.zoom);

        self.prev.copy_from_slice(&self.frame);
        PassKind::Composed(detection)
    }
}
