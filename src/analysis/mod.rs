//! Per-chunk audio analysis: spectrum, onset detection and scope shaping.

mod energy;
mod spectrum;
mod waveform;

pub use energy::{Biquad, Detection, EnergyDetector, COOLDOWN_CALLS, CUTOFF_HZ, NOISE_GATE};
pub use spectrum::{SpectrumAnalyzer, SpectrumError};
pub use waveform::WaveformShaper;
