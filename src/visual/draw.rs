//! Rasterization over row-major RGBA8 buffers.
//!
//! Coordinates are signed; anything outside `0..w` x `0..h` is ignored, never
//! an error.

pub const WHITE: [u8; 3] = [255, 255, 255];

#[inline]
fn index(w: usize, x: i32, y: i32) -> usize {
    (y as usize * w + x as usize) * 4
}

#[inline]
fn in_bounds(w: usize, h: usize, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h
}

pub fn clear_frame(frame: &mut [u8]) {
    frame.fill(0);
}

/// Source-over blend of `rgb` at alpha `a` into the pixel at (x, y).
pub fn set_pixel(frame: &mut [u8], w: usize, h: usize, x: i32, y: i32, rgb: [u8; 3], a: u8) {
    if !in_bounds(w, h, x, y) {
        return;
    }
    let i = index(w, x, y);
    let Some(px) = frame.get_mut(i..i + 4) else {
        return;
    };

    let sa = a as f32 / 255.0;
    let da = px[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        px.fill(0);
        return;
    }
    for c in 0..3 {
        px[c] = ((rgb[c] as f32 * sa + px[c] as f32 * da * (1.0 - sa)) / out_a) as u8;
    }
    px[3] = (out_a * 255.0) as u8;
}

/// Overwrites the pixel at (x, y) without blending.
pub fn draw_pixel(frame: &mut [u8], w: usize, h: usize, x: i32, y: i32, rgba: [u8; 4]) {
    if !in_bounds(w, h, x, y) {
        return;
    }
    let i = index(w, x, y);
    if let Some(px) = frame.get_mut(i..i + 4) {
        px.copy_from_slice(&rgba);
    }
}

/// Bresenham line writing raw RGBA.
///
/// Nothing is drawn when the start point is off-canvas, and the walk stops at
/// the first step that leaves the canvas.
pub fn draw_line(
    frame: &mut [u8],
    w: usize,
    h: usize,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    rgba: [u8; 4],
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    if !in_bounds(w, h, x, y) {
        return;
    }
    loop {
        let i = index(w, x, y);
        let Some(px) = frame.get_mut(i..i + 4) else {
            break;
        };
        px.copy_from_slice(&rgba);

        if x == x1 && y == y1 {
            break;
        }
        let e2 = err * 2;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        if !in_bounds(w, h, x, y) {
            break;
        }
    }
}

#[inline]
fn fpart(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn rfpart(x: f32) -> f32 {
    1.0 - fpart(x)
}

#[inline]
fn alpha_byte(a: f32) -> u8 {
    (a * 255.0) as u8
}

/// Xiaolin Wu antialiased line; `alpha` is 0..=1.
pub fn draw_line_wu(
    frame: &mut [u8],
    w: usize,
    h: usize,
    (mut x0, mut y0): (f32, f32),
    (mut x1, mut y1): (f32, f32),
    rgb: [u8; 3],
    alpha: f32,
) {
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = y1 - y0;
    let gradient = if dx == 0.0 { 1.0 } else { dy / dx };

    let plot = |frame: &mut [u8], a: i32, b: i32, cov: f32| {
        let (x, y) = if steep { (b, a) } else { (a, b) };
        set_pixel(frame, w, h, x, y, rgb, alpha_byte(cov));
    };

    let xend = x0.round();
    let yend = y0 + gradient * (xend - x0);
    let xgap = rfpart(x0 + 0.5);
    let xpxl1 = xend as i32;
    let ypxl1 = yend.floor() as i32;
    plot(frame, xpxl1, ypxl1, rfpart(yend) * xgap * alpha);
    plot(frame, xpxl1, ypxl1 + 1, fpart(yend) * xgap * alpha);
    let mut intery = yend + gradient;

    let xend = x1.round();
    let yend = y1 + gradient * (xend - x1);
    let xgap = fpart(x1 + 0.5);
    let xpxl2 = xend as i32;
    let ypxl2 = yend.floor() as i32;
    plot(frame, xpxl2, ypxl2, rfpart(yend) * xgap * alpha);
    plot(frame, xpxl2, ypxl2 + 1, fpart(yend) * xgap * alpha);

    for x in (xpxl1 + 1)..xpxl2 {
        let y = intery.floor() as i32;
        plot(frame, x, y, rfpart(intery) * alpha);
        plot(frame, x, y + 1, fpart(intery) * alpha);
        intery += gradient;
    }
}

/// Bresenham walk whose alpha ramps linearly from `start_alpha` to `end_alpha`.
#[allow(clippy::too_many_arguments)]
pub fn draw_line_fade(
    frame: &mut [u8],
    w: usize,
    h: usize,
    (mut x0, mut y0): (i32, i32),
    (x1, y1): (i32, i32),
    rgb: [u8; 3],
    start_alpha: f32,
    end_alpha: f32,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let length = (((x1 - x0) as f32).powi(2) + ((y1 - y0) as f32).powi(2)).sqrt() as i32;
    let mut step = 0i32;

    loop {
        let t = if length == 0 { 0.0 } else { step as f32 / length as f32 };
        let a = start_alpha * (1.0 - t) + end_alpha * t;
        set_pixel(frame, w, h, x0, y0, rgb, alpha_byte(a));

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        step += 1;
    }
}

/// Gupta-Sproull style line: intensity falls off with the midpoint error term.
pub fn draw_line_gupta_sproull(
    frame: &mut [u8],
    w: usize,
    h: usize,
    (mut x0, mut y0): (i32, i32),
    (x1, y1): (i32, i32),
    rgb: [u8; 3],
    base_alpha: f32,
) {
    let mut dx = (x1 - x0).abs();
    let mut dy = (y1 - y0).abs();
    let mut sx = if x0 < x1 { 1 } else { -1 };
    let mut sy = if y0 < y1 { 1 } else { -1 };

    let steep = dy > dx;
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut dx, &mut dy);
        std::mem::swap(&mut sx, &mut sy);
    }

    let two_dy = 2 * dy;
    let two_dy_dx = 2 * (dy - dx);
    let mut e = two_dy - dx;
    let (mut x, mut y) = (x0, y0);

    let len = ((dx * dx + dy * dy) as f32).sqrt();
    let inv_denom = if len > 0.0 { 1.0 / (2.0 * len) } else { 0.0 };

    for _ in 0..=dx {
        let distance = e.abs() as f32 * inv_denom;
        let a = alpha_byte((1.0 - distance) * base_alpha);
        if steep {
            set_pixel(frame, w, h, y, x, rgb, a);
        } else {
            set_pixel(frame, w, h, x, y, rgb, a);
        }

        if e >= 0 {
            y += sy;
            e += two_dy_dx;
        } else {
            e += two_dy;
        }
        x += sx;
    }
}

#[inline]
fn curve_y(sample: f32, avg_offset: f32, h: usize, y_offset: i32) -> i32 {
    let half = (h / 2) as i32;
    half - (((sample - 128.0 - avg_offset) * h as f32) as i32) / 512 + y_offset
}

#[inline]
fn curve_index(x: i32, x_offset: i32, w: usize, len: usize) -> usize {
    let t = ((x - x_offset) as f32 / (w.max(2) - 1) as f32).clamp(0.0, 1.0);
    (t * (len - 1) as f32) as usize
}

/// One pixel per column along `curve`, with the rows above and below
/// re-blended at half alpha.
#[allow(clippy::too_many_arguments)]
pub fn draw_horizontal_line_smoothed(
    frame: &mut [u8],
    w: usize,
    h: usize,
    curve: &[f32],
    avg_offset: f32,
    rgb: [u8; 3],
    alpha_factor: f32,
    y_offset: i32,
) {
    if curve.is_empty() || h == 0 {
        return;
    }
    let alpha = alpha_byte(alpha_factor);
    for x in 0..w as i32 {
        let i = curve_index(x, 0, w, curve.len());
        let y = curve_y(curve[i], avg_offset, h, y_offset).clamp(0, h as i32 - 1);

        set_pixel(frame, w, h, x, y, rgb, alpha);
        for ny in [y - 1, y + 1] {
            if in_bounds(w, h, x, ny) {
                let j = index(w, x, ny);
                let existing = [frame[j], frame[j + 1], frame[j + 2]];
                set_pixel(frame, w, h, x, ny, existing, 128);
            }
        }
    }
}

/// Two-pixel-thick white scope trace with half-alpha blended rims.
///
/// `alpha_factor` above 1.0 saturates to an opaque trace.
#[allow(clippy::too_many_arguments)]
pub fn draw_scope(
    frame: &mut [u8],
    w: usize,
    h: usize,
    curve: &[f32],
    avg_offset: f32,
    alpha_factor: f32,
    y_offset: i32,
    x_offset: i32,
) {
    if curve.is_empty() {
        return;
    }
    let hi = h as i32;
    let alpha = alpha_byte(alpha_factor);
    for x in 0..w as i32 {
        let i = curve_index(x, x_offset, w, curve.len());
        let mut y = curve_y(curve[i], avg_offset, h, y_offset);
        if y >= hi - 2 {
            y = hi - 3;
        } else if y < 0 {
            y = 0;
        }

        set_pixel(frame, w, h, x, y, WHITE, alpha);
        set_pixel(frame, w, h, x, y + 1, WHITE, alpha);

        if y > 0 && in_bounds(w, h, x, y - 1) {
            let j = index(w, x, y - 1);
            let rim = rim_color(&frame[j..j + 3]);
            set_pixel(frame, w, h, x, y - 1, rim, 128);
        }
        if y < hi - 3 && in_bounds(w, h, x, y + 2) {
            let j = index(w, x, y + 2);
            let rim = rim_color(&frame[j..j + 3]);
            set_pixel(frame, w, h, x, y + 2, rim, 128);
        }
    }
}

#[inline]
fn rim_color(existing: &[u8]) -> [u8; 3] {
    [
        ((existing[0] as u16 + 255) / 2) as u8,
        ((existing[1] as u16 + 255) / 2) as u8,
        ((existing[2] as u16 + 255) / 2) as u8,
    ]
}
