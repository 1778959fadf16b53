//! Capture: cpal input stream -> lock-free ring -> chunker thread -> sink.
//!
//! The device callback only downmixes to mono and pushes into the ring. A
//! worker thread drains the ring, converts to unsigned 8-bit PCM centered at
//! 128 and hands fixed-length chunks to a [`ChunkSink`].

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::HeapRb;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Receives every complete chunk on the capture worker thread.
pub trait ChunkSink: Send + 'static {
    /// Returning `false` stops capture.
    fn on_chunk(&mut self, chunk: &[u8]) -> bool;
}

impl<F> ChunkSink for F
where
    F: FnMut(&[u8]) -> bool + Send + 'static,
{
    fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        self(chunk)
    }
}

/// Float sample in [-1, 1] to unsigned 8-bit PCM.
#[inline]
pub fn to_u8_sample(s: f32) -> u8 {
    (s * 128.0 + 128.0).clamp(0.0, 255.0) as u8
}

/// Accumulates converted samples into chunks of a fixed length.
pub struct Chunker {
    buf: Vec<u8>,
    len: usize,
}

impl Chunker {
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            buf: Vec::with_capacity(len),
            len,
        }
    }

    /// Feeds one sample; returns `Some(chunk)` each time a chunk fills up.
    pub fn push(&mut self, s: f32) -> Option<&[u8]> {
        if self.buf.len() == self.len {
            self.buf.clear();
        }
        self.buf.push(to_u8_sample(s));
        (self.buf.len() == self.len).then_some(self.buf.as_slice())
    }
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        let mark = if default_name.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        writeln!(out, "  - {name}{mark}")?;
    }
    Ok(())
}

pub struct AudioSystem {
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    stream: Option<cpal::Stream>,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    /// Resolves the input device and its default config without starting it.
    pub fn open(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            sample_rate_hz,
            channels = supported.channels(),
            format = ?supported.sample_format(),
            "audio input selected"
        );
        Ok(Self {
            device,
            supported,
            stream: None,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            sample_rate_hz,
        })
    }

    /// Starts capture; `sink` sees `chunk_len`-sample chunks until it returns
    /// false or the system is dropped.
    pub fn start<S: ChunkSink>(&mut self, chunk_len: usize, mut sink: S) -> anyhow::Result<()> {
        if self.stream.is_some() {
            return Err(anyhow!("audio capture already running"));
        }
        let channels = self.supported.channels() as usize;
        let config: cpal::StreamConfig = self.supported.clone().into();

        // A few seconds of slack so a stalled worker does not drop audio.
        let rb = HeapRb::<f32>::new((self.sample_rate_hz as usize).saturating_mul(4));
        let (mut prod, mut cons) = rb.split();

        let err_fn = |err| tracing::warn!(%err, "audio stream error");
        let stream = match self.supported.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U8 => self.device.build_input_stream(
                &config,
                move |data: &[u8], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start input stream")?;

        let stop = Arc::clone(&self.stop);
        let worker = thread::Builder::new()
            .name("milky-capture".into())
            .spawn(move || {
                let mut chunker = Chunker::new(chunk_len);
                'run: while !stop.load(Ordering::Relaxed) {
                    let mut got_any = false;
                    while let Some(s) = cons.try_pop() {
                        got_any = true;
                        if let Some(chunk) = chunker.push(s) {
                            if !sink.on_chunk(chunk) {
                                stop.store(true, Ordering::Relaxed);
                                break 'run;
                            }
                        }
                    }
                    if !got_any {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                tracing::debug!("capture worker exiting");
            })
            .context("spawn capture worker")?;

        self.stream = Some(stream);
        self.worker = Some(worker);
        Ok(())
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
        self.stream = None;
    }
}

fn select_input_device(host: &cpal::Host, device_query: Option<&str>) -> anyhow::Result<cpal::Device> {
    let Some(want) = device_query.map(str::to_lowercase) else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device found"));
    };
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();
    devices
        .into_iter()
        .find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&want))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no input device matching: {want}"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    let channels = channels.max(1);
    for frame in data.chunks(channels) {
        let acc: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
        let _ = prod.try_push(acc / frame.len() as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_maps_to_midpoint_and_extremes_clamp() {
        assert_eq!(to_u8_sample(0.0), 128);
        assert_eq!(to_u8_sample(1.0), 255);
        assert_eq!(to_u8_sample(-1.0), 0);
        assert_eq!(to_u8_sample(4.0), 255);
    }

    #[test]
    fn chunker_emits_every_len_samples() {
        let mut c = Chunker::new(4);
        let mut emitted = 0;
        for i in 0..10 {
            if let Some(chunk) = c.push(if i % 2 == 0 { 0.5 } else { -0.5 }) {
                assert_eq!(chunk.len(), 4);
                assert_eq!(chunk[0], 192);
                assert_eq!(chunk[1], 64);
                emitted += 1;
            }
        }
        assert_eq!(emitted, 2);
    }
}
