use crate::render::{Frame, Renderer};
use std::io::Write;

const HALF_BLOCK: &str = "\u{2580}";

/// Two canvas rows per terminal cell: upper half is the foreground color,
/// lower half the background. The whole screen is assembled in one buffer
/// and written once.
pub struct HalfBlockRenderer {
    buf: Vec<u8>,
    last_fg: Option<[u8; 3]>,
    last_bg: Option<[u8; 3]>,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            last_fg: None,
            last_bg: None,
        }
    }

    fn paint_cell(&mut self, top: [u8; 3], bottom: [u8; 3]) -> std::io::Result<()> {
        if self.last_fg != Some(top) {
            write!(self.buf, "\x1b[38;2;{};{};{}m", top[0], top[1], top[2])?;
            self.last_fg = Some(top);
        }
        if self.last_bg != Some(bottom) {
            write!(self.buf, "\x1b[48;2;{};{};{}m", bottom[0], bottom[1], bottom[2])?;
            self.last_bg = Some(bottom);
        }
        self.buf.extend_from_slice(HALF_BLOCK.as_bytes());
        Ok(())
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn rgb_at(pixels: &[u8], i: usize) -> [u8; 3] {
    [pixels[i], pixels[i + 1], pixels[i + 2]]
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let w = frame.pixel_width;
        let h = frame.pixel_height;

        if cols == 0 || visual_rows == 0 || w != cols || h != visual_rows * 2 {
            return Ok(());
        }
        let need = w * h * 4;
        if frame.pixels_rgba.len() < need {
            tracing::warn!(need, got = frame.pixels_rgba.len(), "pixel buffer too small");
            return Ok(());
        }

        self.buf.clear();
        if frame.sync_updates {
            self.buf.extend_from_slice(b"\x1b[?2026h");
        }
        // Home, reset, autowrap off while full-width rows are painted.
        self.buf.extend_from_slice(b"\x1b[H\x1b[0m\x1b[?7l");
        self.last_fg = None;
        self.last_bg = None;

        for row in 0..visual_rows {
            let top = row * 2 * w * 4;
            let bottom = top + w * 4;
            for x in 0..cols {
                let t = rgb_at(frame.pixels_rgba, top + x * 4);
                let b = rgb_at(frame.pixels_rgba, bottom + x * 4);
                self.paint_cell(t, b)?;
            }
            self.buf.extend_from_slice(b"\r\n");
        }

        let mut hud_lines = frame.hud.lines();
        for i in 0..frame.hud_rows as usize {
            write!(self.buf, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
            if let Some(line) = hud_lines.next() {
                let end = line
                    .char_indices()
                    .nth(cols)
                    .map_or(line.len(), |(i, _)| i);
                self.buf.extend_from_slice(line[..end].as_bytes());
            }
        }

        self.buf.extend_from_slice(b"\x1b[?7h");
        if frame.sync_updates {
            self.buf.extend_from_slice(b"\x1b[?2026l");
        }
        out.write_all(&self.buf)?;
        out.flush()?;
        Ok(())
    }
}
