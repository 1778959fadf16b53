use std::f32::consts::PI;

pub const CUTOFF_HZ: f32 = 500.0;
pub const FILTER_Q: f32 = 1.0;
pub const NOISE_GATE: f32 = 0.5;
pub const COOLDOWN_CALLS: u32 = 3;

const ENERGY_ALPHA: f32 = 0.85;
const FLUX_ALPHA: f32 = 0.85;
const ENERGY_RATIO_THRESHOLD: f32 = 1.3;
const FLUX_RATIO_THRESHOLD: f32 = 1.4;
const MIN_VOLUME: f32 = 0.15;
const EPS: f32 = 1e-6;

/// Second-order low-pass section.
///
/// The b-terms act on the previous *inputs*, not outputs, so the response is
/// FIR-like with unity gain at DC. The detector thresholds assume this response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn low_pass(cutoff_hz: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();
        let norm = 1.0 / (1.0 + alpha);

        let a0 = (1.0 - cos_omega) / 2.0;
        Self {
            a0: a0 * norm,
            a1: (1.0 - cos_omega) * norm,
            a2: a0 * norm,
            b1: -2.0 * cos_omega * norm,
            b2: (1.0 - alpha) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.a0 * x + self.a1 * self.z1 + self.a2 * self.z2
            - self.b1 * self.z1
            - self.b2 * self.z2;
        self.z2 = self.z1;
        self.z1 = x;
        y
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Detection {
    pub spike: bool,
    /// False when the chunk fell under the noise gate.
    pub gated_in: bool,
    pub energy: f32,
    pub energy_ratio: f32,
    pub flux_ratio: f32,
}

struct Emphasis {
    filter: Biquad,
    weights: Vec<f32>,
}

/// Adaptive energy + spectral-flux onset detector.
pub struct EnergyDetector {
    sample_rate: u32,
    emphasis: Option<Emphasis>,
    avg_energy: f32,
    avg_flux: f32,
    cooldown: u32,
    prev_spectrum: Vec<f32>,
    spike: bool,
}

impl EnergyDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            emphasis: None,
            avg_energy: 0.0,
            avg_flux: 0.0,
            // Start "cooled down" so the very first onset can fire.
            cooldown: COOLDOWN_CALLS,
            prev_spectrum: Vec::new(),
            spike: false,
        }
    }

    pub fn spike_detected(&self) -> bool {
        self.spike
    }

    pub fn avg_energy(&self) -> f32 {
        self.avg_energy
    }

    pub fn avg_flux(&self) -> f32 {
        self.avg_flux
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Number of spectrum bins under the cutoff, once the first chunk has been seen.
    pub fn low_bins(&self) -> Option<usize> {
        self.emphasis.as_ref().map(|e| e.weights.len())
    }

    pub fn detect(&mut self, waveform: &[u8], spectrum: &[u8]) -> Detection {
        if waveform.is_empty() {
            self.spike = false;
            return Detection::default();
        }

        let sample_rate = self.sample_rate as f32;
        let spectrum_len = spectrum.len();
        let emphasis = self.emphasis.get_or_insert_with(|| {
            let bin_width = sample_rate / (2.0 * spectrum_len.max(1) as f32);
            let max_bin = ((CUTOFF_HZ / bin_width) as usize).min(spectrum_len);
            let weights = (0..max_bin)
                .map(|i| 1.0 / ((i + 1) as f32 * bin_width + EPS))
                .collect();
            Emphasis {
                filter: Biquad::low_pass(CUTOFF_HZ, sample_rate, FILTER_Q),
                weights,
            }
        });

        let mut sum_sq = 0.0f32;
        for &s in waveform {
            let y = emphasis.filter.process(s as f32 - 128.0);
            sum_sq += y * y;
        }
        let energy = (sum_sq / waveform.len() as f32).sqrt();

        if energy < NOISE_GATE {
            self.spike = false;
            return Detection {
                energy,
                ..Detection::default()
            };
        }

        self.avg_energy = self.avg_energy * ENERGY_ALPHA + energy * (1.0 - ENERGY_ALPHA);
        let energy_ratio = energy / (self.avg_energy + EPS);

        if self.prev_spectrum.len() < spectrum_len {
            self.prev_spectrum.resize(spectrum_len, 0.0);
        }
        let mut flux = 0.0f32;
        let mut sum_weights = 0.0f32;
        for (i, &bin) in spectrum.iter().enumerate() {
            let w = emphasis.weights.get(i).copied().unwrap_or(0.0);
            let cur = bin as f32;
            let diff = cur - self.prev_spectrum[i];
            self.prev_spectrum[i] = cur;
            if diff > 0.0 {
                flux += diff * w;
            }
            sum_weights += w;
        }
        if sum_weights > 0.0 {
            flux /= sum_weights;
        }

        self.avg_flux = self.avg_flux * FLUX_ALPHA + flux * (1.0 - FLUX_ALPHA);
        let flux_ratio = flux / (self.avg_flux + EPS);

        let spike = self.cooldown >= COOLDOWN_CALLS
            && energy_ratio > ENERGY_RATIO_THRESHOLD
            && flux_ratio > FLUX_RATIO_THRESHOLD
            && energy > MIN_VOLUME;

        if spike {
            tracing::debug!(energy, energy_ratio, flux_ratio, "energy spike");
            self.cooldown = 0;
        } else {
            self.cooldown = self.cooldown.saturating_add(1);
        }
        self.spike = spike;

        Detection {
            spike,
            gated_in: true,
            energy,
            energy_ratio,
            flux_ratio,
        }
    }
}
