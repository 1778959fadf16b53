use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "milky-viz", version, about = "Audio-driven feedback visualizer for the terminal")]
pub struct Config {
    #[arg(long, default_value_t = 320)]
    pub width: usize,

    #[arg(long, default_value_t = 180)]
    pub height: usize,

    /// 24, 16 or 8 quantize the palette output; anything else passes through.
    #[arg(long, default_value_t = 32)]
    pub bit_depth: u8,

    #[arg(long, default_value_t = 0.0123)]
    pub speed: f32,

    #[arg(long, default_value_t = 16)]
    pub min_interval_ms: u64,

    #[arg(long, default_value_t = 1024)]
    pub chunk_len: usize,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, default_value_t = false)]
    pub tunnel: bool,

    #[arg(long, default_value_t = 2)]
    pub chaser_count: usize,

    #[arg(long, value_enum, default_value_t = ChaserLine::Bresenham)]
    pub chaser_line: ChaserLine,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChaserLine {
    Bresenham,
    #[value(alias = "xiaolin-wu")]
    Wu,
    #[value(name = "gupta-sproull", alias = "gupta")]
    GuptaSproull,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("canvas must be at least 1x1 (got {width}x{height})")]
    EmptyCanvas { width: usize, height: usize },
    #[error("chunk length {0} is too short (need at least 4 samples)")]
    ChunkTooShort(usize),
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("palette transition needs at least one step")]
    ZeroTransitionSteps,
    #[error("zoom factor must be positive and finite (got {0})")]
    BadZoom(f32),
    #[error("tunnel thickness must be positive (got {0})")]
    BadTunnelThickness(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaserSettings {
    pub count: usize,
    pub seed: u64,
    pub thickness: i32,
    pub line: ChaserLine,
    /// Multiplier applied to the composer speed before it reaches the emitters.
    pub speed_mul: f32,
}

impl Default for ChaserSettings {
    fn default() -> Self {
        Self {
            count: 2,
            seed: 42,
            thickness: 2,
            line: ChaserLine::Bresenham,
            speed_mul: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunnelSettings {
    pub radius: i32,
    pub thickness: i32,
    /// Minimum gap between rings while spikes keep firing.
    pub min_gap_ms: u64,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            radius: 50,
            thickness: 2,
            min_gap_ms: 20,
        }
    }
}

/// Everything the synthesis core needs; no CLI types leak past this point.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualConfig {
    pub width: usize,
    pub height: usize,
    pub bit_depth: u8,
    pub speed: f32,
    pub sample_rate: u32,
    pub chunk_len: usize,
    pub min_chunk_len: usize,
    pub min_render_interval_ms: u64,
    pub volume_scale: f32,
    pub zoom: f32,
    pub palette_transition_steps: u32,
    pub palette_cooldown_ms: u64,
    pub chaser: ChaserSettings,
    pub tunnel: Option<TunnelSettings>,
    pub seed: u64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            bit_depth: 32,
            speed: 0.0123,
            sample_rate: 44_100,
            chunk_len: 1024,
            min_chunk_len: 1024,
            min_render_interval_ms: 16,
            volume_scale: 0.65,
            zoom: 1.32,
            palette_transition_steps: 650,
            palette_cooldown_ms: 10_000,
            chaser: ChaserSettings::default(),
            tunnel: None,
            seed: 0x6d69_6c6b,
        }
    }
}

impl VisualConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if self.chunk_len < 4 {
            return Err(ConfigError::ChunkTooShort(self.chunk_len));
        }
        if self.min_chunk_len < 4 {
            return Err(ConfigError::ChunkTooShort(self.min_chunk_len));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.palette_transition_steps == 0 {
            return Err(ConfigError::ZeroTransitionSteps);
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(ConfigError::BadZoom(self.zoom));
        }
        if let Some(t) = self.tunnel {
            if t.thickness <= 0 {
                return Err(ConfigError::BadTunnelThickness(t.thickness));
            }
        }
        Ok(())
    }

    pub fn frame_len(&self) -> usize {
        self.width.saturating_mul(self.height).saturating_mul(4)
    }
}

impl Config {
    pub fn visual_config(&self, sample_rate: u32) -> VisualConfig {
        let defaults = VisualConfig::default();
        VisualConfig {
            width: self.width,
            height: self.height,
            bit_depth: self.bit_depth,
            speed: self.speed,
            sample_rate,
            chunk_len: self.chunk_len,
            min_chunk_len: defaults.min_chunk_len.min(self.chunk_len),
            min_render_interval_ms: self.min_interval_ms,
            chaser: ChaserSettings {
                count: self.chaser_count,
                line: self.chaser_line,
                ..ChaserSettings::default()
            },
            tunnel: self.tunnel.then(TunnelSettings::default),
            seed: self.seed.unwrap_or_else(|| fastrand::u64(..)),
            ..defaults
        }
    }
}
