//! Per-chunk driver: rate gate, spectrum, composition, publish.

use crate::analysis::SpectrumAnalyzer;
use crate::config::VisualConfig;
use crate::exchange::{FrameProducer, PublishError};
use crate::visual::{ComposeError, FrameComposer, PassKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    /// Magnitude spectrum of the chunk, `len / 2` bins.
    pub spectrum: Vec<u8>,
    pub spike: bool,
    pub pass: PassKind,
    /// Sequence number, when the frame reached the exchange.
    pub published: Option<u64>,
}

pub struct Pipeline {
    min_chunk_len: usize,
    min_interval_ms: u64,
    last_render_ms: Option<u64>,
    analyzer: SpectrumAnalyzer,
    composer: FrameComposer,
    producer: Option<FrameProducer>,
    dropped: u64,
    spikes: u64,
    closed: bool,
}

impl Pipeline {
    /// `producer` may be `None` for offline runs that read the composed frame
    /// straight from [`frame`](Self::frame).
    pub fn new(cfg: &VisualConfig, producer: Option<FrameProducer>) -> Result<Self, ComposeError> {
        let composer = FrameComposer::new(cfg)?;
        tracing::info!(
            w = cfg.width,
            h = cfg.height,
            sample_rate = cfg.sample_rate,
            bit_depth = cfg.bit_depth,
            effects = ?composer.effect_names().collect::<Vec<_>>(),
            "pipeline ready"
        );
        Ok(Self {
            min_chunk_len: cfg.min_chunk_len,
            min_interval_ms: cfg.min_render_interval_ms,
            last_render_ms: None,
            analyzer: SpectrumAnalyzer::new(),
            composer,
            producer,
            dropped: 0,
            spikes: 0,
            closed: false,
        })
    }

    /// Runs one audio chunk through the pipeline.
    ///
    /// Returns `None` when the chunk was gated out: too short, the very first
    /// chunk (which only arms the timer), or arriving before the minimum
    /// render interval has passed.
    pub fn on_audio_chunk(&mut self, chunk: &[u8], now_ms: u64) -> Option<ChunkReport> {
        if chunk.len() < self.min_chunk_len {
            tracing::trace!(len = chunk.len(), "chunk too short");
            return None;
        }
        let Some(last) = self.last_render_ms else {
            self.last_render_ms = Some(now_ms);
            return None;
        };
        if now_ms.saturating_sub(last) < self.min_interval_ms {
            return None;
        }
        self.last_render_ms = Some(now_ms);

        let mut spectrum = vec![0u8; chunk.len() / 2];
        if let Err(err) = self.analyzer.compute(chunk, &mut spectrum) {
            tracing::warn!(%err, "spectrum unavailable");
        }

        let pass = self.composer.render(chunk, &spectrum, now_ms);
        let spike = pass.spike();
        if spike {
            self.spikes += 1;
        }

        let published = match pass {
            PassKind::Skipped => None,
            _ => self.publish(),
        };

        Some(ChunkReport {
            spectrum,
            spike,
            pass,
            published,
        })
    }

    fn publish(&mut self) -> Option<u64> {
        let producer = self.producer.as_mut()?;
        match producer.publish(self.composer.frame()) {
            Ok(seq) => Some(seq),
            Err(PublishError::Full) => {
                self.dropped += 1;
                tracing::trace!(dropped = self.dropped, "display behind; frame dropped");
                None
            }
            Err(PublishError::Closed) => {
                if !self.closed {
                    tracing::debug!("frame exchange closed; no more publishing");
                }
                self.closed = true;
                None
            }
            Err(err @ PublishError::SizeMismatch { .. }) => {
                tracing::warn!(%err, "frame not published");
                None
            }
        }
    }

    pub fn frame(&self) -> &[u8] {
        self.composer.frame()
    }

    pub fn composer(&self) -> &FrameComposer {
        &self.composer
    }

    pub fn palette_generation(&self) -> u64 {
        self.composer.palette().generation()
    }

    pub fn spike_count(&self) -> u64 {
        self.spikes
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// True once the display side has shut the exchange.
    pub fn is_closed(&self) -> bool {
        self.closed || self.producer.as_ref().is_some_and(|p| p.is_closed())
    }
}
