use crate::parallel::for_each_pixel;

/// Per-pass decay applied to the retained frame.
pub const DECAY: f32 = 0.96;

/// Scales RGB by `factor`, alpha untouched.
pub fn blur_frame(frame: &mut [u8], factor: f32) {
    for_each_pixel(frame, |_, px| {
        px[0] = (px[0] as f32 * factor) as u8;
        px[1] = (px[1] as f32 * factor) as u8;
        px[2] = (px[2] as f32 * factor) as u8;
    });
}

/// `(p + (p * 85 mod 256)) >> 1`. The 8-bit wrap is what gives the trails
/// their banded texture.
#[inline]
pub fn mass_fade_value(p: u8) -> u8 {
    ((p as u16 + p.wrapping_mul(85) as u16) >> 1) as u8
}

/// Applies [`mass_fade_value`] to RGB in place.
pub fn preserve_mass_fade(frame: &mut [u8]) {
    for_each_pixel(frame, |_, px| {
        px[0] = mass_fade_value(px[0]);
        px[1] = mass_fade_value(px[1]);
        px[2] = mass_fade_value(px[2]);
    });
}
