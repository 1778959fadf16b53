/// Bass-emphasis smoother that turns a raw chunk into the drawable scope curve.
pub struct WaveformShaper {
    volume_scale: f32,
    average_offset: f32,
}

impl WaveformShaper {
    pub fn new(volume_scale: f32) -> Self {
        Self {
            volume_scale,
            average_offset: 0.0,
        }
    }

    /// Mean of `shaped[i] - raw[i]` over the last shaped chunk.
    pub fn average_offset(&self) -> f32 {
        self.average_offset
    }

    /// Fills `out` with `len - 2` shaped samples. Chunks of two samples or
    /// fewer leave `out` empty and the offset unchanged.
    pub fn shape(&mut self, waveform: &[u8], out: &mut Vec<f32>) {
        out.clear();
        if waveform.len() <= 2 {
            return;
        }
        let f1 = 0.6 * self.volume_scale;
        let f2 = 0.2 * self.volume_scale;
        let n = waveform.len() - 2;

        let mut total = 0.0f32;
        out.extend((0..n).map(|i| {
            let s = f1 * waveform[i] as f32 + f2 * waveform[i + 2] as f32;
            total += s - waveform[i] as f32;
            s
        }));
        self.average_offset = total / n as f32;
    }
}
