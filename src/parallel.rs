//! Parallel-for helpers over RGBA buffers.
//!
//! Every body passed here must only touch the pixel (or row) it is handed;
//! stages stay sequential, pixels inside a stage fan out over the rayon pool.

use rayon::prelude::*;

/// Below this many pixels the pool overhead dominates and we stay serial.
const PAR_MIN_PIXELS: usize = 8 * 1024;

pub fn for_each_pixel<F>(pixels: &mut [u8], f: F)
where
    F: Fn(usize, &mut [u8]) + Send + Sync,
{
    if pixels.len() / 4 < PAR_MIN_PIXELS {
        for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
            f(i, px);
        }
    } else {
        pixels
            .par_chunks_exact_mut(4)
            .enumerate()
            .for_each(|(i, px)| f(i, px));
    }
}

/// Calls `f(y, row)` for each `w`-pixel row.
pub fn for_each_row<F>(pixels: &mut [u8], w: usize, f: F)
where
    F: Fn(usize, &mut [u8]) + Send + Sync,
{
    if w == 0 {
        return;
    }
    let stride = w * 4;
    if pixels.len() / 4 < PAR_MIN_PIXELS {
        for (y, row) in pixels.chunks_exact_mut(stride).enumerate() {
            f(y, row);
        }
    } else {
        pixels
            .par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}

/// Pairs each destination pixel with the source pixel at the same index.
pub fn zip_pixels<F>(dst: &mut [u8], src: &[u8], f: F)
where
    F: Fn(&mut [u8], &[u8]) + Send + Sync,
{
    if dst.len() / 4 < PAR_MIN_PIXELS {
        for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            f(d, s);
        }
    } else {
        dst.par_chunks_exact_mut(4)
            .zip(src.par_chunks_exact(4))
            .for_each(|(d, s)| f(d, s));
    }
}
