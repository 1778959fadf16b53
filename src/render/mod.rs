mod halfblock;

pub use halfblock::HalfBlockRenderer;

use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Nearest-neighbour resample of an RGBA canvas into `dst`, resized to
/// `dw * dh * 4`. A short or empty source leaves `dst` black.
pub fn downsample_nearest(
    src: &[u8],
    sw: usize,
    sh: usize,
    dst: &mut Vec<u8>,
    dw: usize,
    dh: usize,
) {
    dst.clear();
    dst.resize(dw.saturating_mul(dh).saturating_mul(4), 0);
    if sw == 0 || sh == 0 || src.len() < sw * sh * 4 {
        return;
    }
    for y in 0..dh {
        let sy = (y * sh / dh.max(1)).min(sh - 1);
        let src_row = &src[sy * sw * 4..(sy + 1) * sw * 4];
        let dst_row = &mut dst[y * dw * 4..(y + 1) * dw * 4];
        for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
            let sx = (x * sw / dw.max(1)).min(sw - 1);
            px.copy_from_slice(&src_row[sx * 4..sx * 4 + 4]);
        }
    }
}
