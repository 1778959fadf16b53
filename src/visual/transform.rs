use crate::parallel::{for_each_row, zip_pixels};

/// Weight of the rotated copy when it is laid back over the frame.
pub const ROTATE_BLEND: f32 = 0.7;
const EASE: f32 = 0.005;
const RETARGET_EPS: f32 = 0.01;

/// Slowly drifting spin angle that picks a fresh random target whenever it
/// arrives at the current one.
pub struct Rotation {
    last: f32,
    target: f32,
    rng: fastrand::Rng,
}

impl Rotation {
    pub fn new(seed: u64) -> Self {
        Self {
            last: 0.0,
            target: 0.0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Last applied angle, radians.
    pub fn angle(&self) -> f32 {
        self.last
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advances the angle one pass and returns it.
    pub fn step(&mut self) -> f32 {
        if (self.last - self.target).abs() < RETARGET_EPS {
            // Whole degrees in [-45, 44].
            self.target = (self.rng.i32(-45..45) as f32).to_radians();
        }
        self.last += (self.target - self.last) * EASE;
        self.last
    }

    pub fn rotate(&mut self, frame: &mut [u8], scratch: &mut [u8], w: usize, h: usize) {
        let theta = self.step();
        rotate_by(frame, scratch, w, h, theta, ROTATE_BLEND);
    }
}

/// Nearest-samples the frame rotated by `theta` into `scratch`, then blends
/// `scratch` back over every byte of `frame` with weight `blend`.
pub fn rotate_by(frame: &mut [u8], scratch: &mut [u8], w: usize, h: usize, theta: f32, blend: f32) {
    let len = w * h * 4;
    if w == 0 || h == 0 || frame.len() < len || scratch.len() < len {
        return;
    }
    let (sin, cos) = theta.sin_cos();
    let cx = w as f32 * 0.5;
    let cy = h as f32 * 0.5;

    let src: &[u8] = frame;
    scratch[..len].fill(0);
    for_each_row(&mut scratch[..len], w, |y, row| {
        let yt = y as f32 - cy;
        for x in 0..w {
            let xt = x as f32 - cx;
            let sx = (cos * xt - sin * yt + cx) as i32;
            let sy = (sin * xt + cos * yt + cy) as i32;
            if sx >= 0 && sy >= 0 && (sx as usize) < w && (sy as usize) < h {
                let si = (sy as usize * w + sx as usize) * 4;
                row[x * 4..x * 4 + 4].copy_from_slice(&src[si..si + 4]);
            }
        }
    });

    let keep = 1.0 - blend;
    zip_pixels(&mut frame[..len], &scratch[..len], |d, s| {
        for c in 0..4 {
            d[c] = (d[c] as f32 * keep + s[c] as f32 * blend) as u8;
        }
    });
}

/// Uniform zoom about the center; pixels whose source falls outside the
/// canvas come out transparent black.
pub fn scale(frame: &mut [u8], scratch: &mut [u8], w: usize, h: usize, factor: f32) {
    let len = w * h * 4;
    if w == 0 || h == 0 || frame.len() < len || scratch.len() < len || factor <= 0.0 {
        return;
    }
    let cx = w as f32 * 0.5;
    let cy = h as f32 * 0.5;
    let inv = 1.0 / factor;

    let src: &[u8] = frame;
    scratch[..len].fill(0);
    for_each_row(&mut scratch[..len], w, |y, row| {
        let sy = ((y as f32 - cy) * inv + cy).round() as i32;
        if sy < 0 || sy as usize >= h {
            return;
        }
        for x in 0..w {
            let sx = ((x as f32 - cx) * inv + cx).round() as i32;
            if sx >= 0 && (sx as usize) < w {
                let si = (sy as usize * w + sx as usize) * 4;
                row[x * 4..x * 4 + 4].copy_from_slice(&src[si..si + 4]);
            }
        }
    });
    frame[..len].copy_from_slice(&scratch[..len]);
}
