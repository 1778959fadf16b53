use crate::parallel::for_each_pixel;

/// Quantization levels per channel for a nominal color depth.
pub fn levels_for(depth: u8) -> u32 {
    match depth {
        16 => 31,
        8 => 7,
        _ => 255,
    }
}

pub fn quantize(color: u8, depth: u8) -> u8 {
    let levels = levels_for(depth);
    ((color as u32 * levels / 255) * (255 / levels)) as u8
}

/// Adds 7/16 of the quantization error back into the same channel.
pub fn dither(quantized: u8, value: u8) -> u8 {
    let err = value as i16 - quantized as i16;
    (quantized as i16 + err * 7 / 16).clamp(0, 255) as u8
}

/// Quantizes and dithers RGB; alpha untouched. Depths other than 24/16/8
/// leave the frame as is.
pub fn reduce_bit_depth(frame: &mut [u8], depth: u8) {
    if levels_for(depth) == 255 {
        return;
    }
    for_each_pixel(frame, |_, px| {
        for c in 0..3 {
            px[c] = dither(quantize(px[c], depth), px[c]);
        }
    });
}
