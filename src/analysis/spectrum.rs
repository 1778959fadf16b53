use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpectrumError {
    #[error("cannot transform an empty chunk")]
    EmptyChunk,
    #[error("spectrum buffer holds {got} bins but a {len}-sample chunk yields {need}")]
    OutputLen { len: usize, need: usize, got: usize },
}

/// Magnitude spectrum of unsigned 8-bit chunks.
///
/// The plan is cached per chunk length; a steady capture size never re-plans.
/// Only the plan is kept (not the planner) so the analyzer can move onto the
/// capture thread.
pub struct SpectrumAnalyzer {
    plan: Option<(usize, Arc<dyn Fft<f32>>)>,
    buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            plan: None,
            buf: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Writes `floor(n/2)` bins scaled to 0..=255 into `out`.
    ///
    /// On error `out` is left untouched, so callers pass a zeroed buffer.
    pub fn compute(&mut self, waveform: &[u8], out: &mut [u8]) -> Result<(), SpectrumError> {
        let n = waveform.len();
        if n == 0 {
            return Err(SpectrumError::EmptyChunk);
        }
        let need = n / 2;
        if out.len() != need {
            return Err(SpectrumError::OutputLen {
                len: n,
                need,
                got: out.len(),
            });
        }

        let fft = match &self.plan {
            Some((len, fft)) if *len == n => Arc::clone(fft),
            _ => {
                let fft = FftPlanner::new().plan_fft_forward(n);
                self.scratch
                    .resize(fft.get_inplace_scratch_len(), Complex::new(0.0, 0.0));
                self.plan = Some((n, Arc::clone(&fft)));
                fft
            }
        };

        self.buf.clear();
        self.buf.extend(
            waveform
                .iter()
                .map(|&s| Complex::new((s as f32 - 128.0) / 128.0, 0.0)),
        );
        fft.process_with_scratch(&mut self.buf, &mut self.scratch);

        let norm = 255.0 / n as f32;
        for (dst, c) in out.iter_mut().zip(self.buf.iter()) {
            *dst = (c.norm() * norm) as u8;
        }
        Ok(())
    }

    /// Allocating variant that degrades to an all-zero spectrum.
    pub fn spectrum(&mut self, waveform: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; waveform.len() / 2];
        if let Err(err) = self.compute(waveform, &mut out) {
            tracing::warn!("spectrum skipped: {err}");
        }
        out
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
