use super::{Effect, EffectCtx};
use crate::config::TunnelSettings;
use crate::parallel::for_each_row;
use crate::visual::palette::MAX_COLOR;

pub const TUNNEL_COLOR: [u8; 4] = [MAX_COLOR; 4];

/// A dim ring stamped on spikes; feedback zoom turns successive rings into a
/// tunnel.
pub struct TunnelRing {
    settings: TunnelSettings,
    last_ms: Option<u64>,
}

impl TunnelRing {
    pub fn new(settings: TunnelSettings) -> Self {
        Self {
            settings,
            last_ms: None,
        }
    }

    /// Radius actually drawn on a `w` x `h` canvas.
    pub fn effective_radius(&self, w: usize, h: usize) -> i32 {
        let t = self.settings.thickness;
        let half_canvas = (w.max(h) / 2) as i32;
        if self.settings.radius + t / 2 > half_canvas {
            (half_canvas - t / 2).max(0)
        } else {
            self.settings.radius
        }
    }

    /// Returns whether a ring was drawn.
    pub fn render(&mut self, frame: &mut [u8], w: usize, h: usize, spike: bool, now_ms: u64) -> bool {
        let due = match self.last_ms {
            None => true,
            Some(last) => spike && now_ms.saturating_sub(last) > self.settings.min_gap_ms,
        };
        if !due || w == 0 || h == 0 {
            return false;
        }
        let t = self.settings.thickness;
        if t <= 0 {
            tracing::warn!(thickness = t, "tunnel thickness must be positive");
            return false;
        }
        let radius = self.effective_radius(w, h);
        if radius != self.settings.radius {
            tracing::debug!(requested = self.settings.radius, radius, "tunnel radius clamped to canvas");
        }

        let inner = radius as f32 - t as f32 / 2.0;
        let outer = radius as f32 + t as f32 / 2.0;
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let len = (w * h * 4).min(frame.len());
        for_each_row(&mut frame[..len], w, |y, row| {
            let dy = y as f32 - cy;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 - cx;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= inner && d <= outer {
                    px.copy_from_slice(&TUNNEL_COLOR);
                }
            }
        });

        self.last_ms = Some(now_ms);
        true
    }
}

impl Effect for TunnelRing {
    fn name(&self) -> &'static str {
        "tunnel"
    }

    fn render(&mut self, ctx: &EffectCtx, frame: &mut [u8]) {
        TunnelRing::render(self, frame, ctx.w, ctx.h, ctx.spike, ctx.now_ms);
    }
}
