use milky_viz::analysis::{
    Biquad, EnergyDetector, SpectrumAnalyzer, SpectrumError, WaveformShaper, COOLDOWN_CALLS,
};

const SAMPLE_RATE: u32 = 44_100;

fn silence(n: usize) -> Vec<u8> {
    vec![128u8; n]
}

/// Square wave between 40 and 216 with `half`-sample half periods.
fn square(n: usize, half: usize) -> Vec<u8> {
    (0..n)
        .map(|i| if (i / half) % 2 == 0 { 216 } else { 40 })
        .collect()
}

fn sine(n: usize, bin: usize, amp: f32) -> Vec<u8> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32;
            (128.0 + amp * phase.sin()).round() as u8
        })
        .collect()
}

// ── Spectrum ────────────────────────────────────────────────────────────────

#[test]
fn silence_has_an_empty_spectrum() {
    let mut a = SpectrumAnalyzer::new();
    let spec = a.spectrum(&silence(1024));
    assert_eq!(spec.len(), 512);
    assert!(spec.iter().all(|&b| b == 0));
}

#[test]
fn odd_chunks_yield_floor_half_bins() {
    let mut a = SpectrumAnalyzer::new();
    assert_eq!(a.spectrum(&silence(1025)).len(), 512);
}

#[test]
fn pure_tone_peaks_in_its_bin() {
    let mut a = SpectrumAnalyzer::new();
    let spec = a.spectrum(&sine(1024, 16, 100.0));
    let (peak, &value) = spec
        .iter()
        .enumerate()
        .max_by_key(|(_, v)| **v)
        .unwrap();
    assert_eq!(peak, 16);
    assert!(value > 80, "peak magnitude {value}");
}

#[test]
fn plan_is_reused_across_chunk_lengths() {
    let mut a = SpectrumAnalyzer::new();
    let first = a.spectrum(&sine(1024, 8, 90.0));
    let _ = a.spectrum(&sine(512, 8, 90.0));
    let again = a.spectrum(&sine(1024, 8, 90.0));
    assert_eq!(first, again);
}

#[test]
fn compute_rejects_bad_buffers() {
    let mut a = SpectrumAnalyzer::new();
    let mut out = [0u8; 4];
    assert_eq!(a.compute(&[], &mut out), Err(SpectrumError::EmptyChunk));
    assert_eq!(
        a.compute(&silence(16), &mut out),
        Err(SpectrumError::OutputLen {
            len: 16,
            need: 8,
            got: 4
        })
    );
}

// ── Waveform shaping ────────────────────────────────────────────────────────

#[test]
fn shaper_output_is_two_shorter_and_tracks_offset() {
    let mut shaper = WaveformShaper::new(0.65);
    let mut out = Vec::new();
    shaper.shape(&silence(1024), &mut out);
    assert_eq!(out.len(), 1022);
    // 0.8 * 0.65 * 128
    assert!(out.iter().all(|&s| (s - 66.56).abs() < 1e-3));
    assert!((shaper.average_offset() + 61.44).abs() < 1e-3);
}

#[test]
fn shaper_ignores_tiny_chunks() {
    let mut shaper = WaveformShaper::new(0.65);
    let mut out = vec![1.0; 3];
    shaper.shape(&[1, 2], &mut out);
    assert!(out.is_empty());
    assert_eq!(shaper.average_offset(), 0.0);
}

// ── Onset detection ─────────────────────────────────────────────────────────

#[test]
fn silence_never_spikes() {
    let mut a = SpectrumAnalyzer::new();
    let mut d = EnergyDetector::new(SAMPLE_RATE);
    let chunk = silence(1024);
    let spec = a.spectrum(&chunk);
    for _ in 0..20 {
        let det = d.detect(&chunk, &spec);
        assert!(!det.spike);
        assert!(!det.gated_in);
    }
    assert!(!d.spike_detected());
}

#[test]
fn first_loud_onset_fires_once() {
    let mut a = SpectrumAnalyzer::new();
    let mut d = EnergyDetector::new(SAMPLE_RATE);
    let chunk = square(1024, 128);
    let spec = a.spectrum(&chunk);

    let first = d.detect(&chunk, &spec);
    assert!(first.spike, "{first:?}");
    assert!(first.gated_in);
    assert!(first.energy > 80.0 && first.energy < 95.0, "energy {}", first.energy);
    assert_eq!(d.cooldown(), 0);

    // Same spectrum again: no positive flux, no onset.
    for _ in 0..5 {
        assert!(!d.detect(&chunk, &spec).spike);
    }
}

#[test]
fn cooldown_suppresses_back_to_back_onsets() {
    let mut a = SpectrumAnalyzer::new();
    let mut d = EnergyDetector::new(SAMPLE_RATE);
    let a_chunk = square(1024, 128);
    let b_chunk = square(1024, 64);
    let a_spec = a.spectrum(&a_chunk);
    let b_spec = a.spectrum(&b_chunk);

    assert!(d.detect(&a_chunk, &a_spec).spike);
    let second = d.detect(&b_chunk, &b_spec);
    assert!(!second.spike);
    assert_eq!(d.cooldown(), 1);
    assert!(COOLDOWN_CALLS > 1);
}

#[test]
fn low_bins_cover_frequencies_under_cutoff() {
    let mut a = SpectrumAnalyzer::new();
    let mut d = EnergyDetector::new(SAMPLE_RATE);
    assert_eq!(d.low_bins(), None);
    let chunk = square(1024, 128);
    let spec = a.spectrum(&chunk);
    d.detect(&chunk, &spec);
    // 44.1 kHz over 512 bins is ~43 Hz per bin.
    assert_eq!(d.low_bins(), Some(11));
}

#[test]
fn low_pass_settles_to_dc() {
    let mut f = Biquad::low_pass(500.0, SAMPLE_RATE as f32, 1.0);
    let mut y = 0.0;
    for _ in 0..8 {
        y = f.process(10.0);
    }
    assert!((y - 10.0).abs() < 1e-3);
}
