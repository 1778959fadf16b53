use super::{Effect, EffectCtx};
use crate::config::{ChaserLine, ChaserSettings};
use crate::visual::draw::{draw_line, draw_line_gupta_sproull, draw_line_wu, WHITE};

pub const MAX_CHASERS: usize = 20;
const EDGE_ALPHA: u8 = 127;

#[derive(Clone, Copy, Debug)]
struct Chaser {
    coeff: [f32; 4],
    path_x: f32,
    path_y: f32,
    prev: (i32, i32),
}

/// Lissajous-style emitters that streak a line from their last position to
/// the next one every pass.
pub struct ChaserField {
    settings: ChaserSettings,
    chasers: Vec<Chaser>,
    dims: (usize, usize),
}

impl ChaserField {
    pub fn new(settings: ChaserSettings) -> Self {
        Self {
            settings,
            chasers: Vec::new(),
            dims: (0, 0),
        }
    }

    pub fn count(&self) -> usize {
        self.settings.count.min(MAX_CHASERS)
    }

    pub fn positions(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.chasers.iter().map(|c| c.prev)
    }

    /// Canvas the emitters were last laid out for.
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    fn reinit(&mut self, w: usize, h: usize) {
        let mut rng = fastrand::Rng::with_seed(self.settings.seed);
        let n = self.count();
        self.chasers.clear();
        for _ in 0..n {
            let coeff = [(); 4].map(|_| rng.u32(0..100) as f32 * 0.01);
            let path_x = (rng.u32(0..61) + 20) as f32 * 0.01 * w as f32 / 4.0;
            let path_y = (rng.u32(0..61) + 20) as f32 * 0.01 * h as f32 / 4.0;
            self.chasers.push(Chaser {
                coeff,
                path_x,
                path_y,
                prev: ((w / 2) as i32, (h / 2) as i32),
            });
        }
        self.dims = (w, h);
        tracing::debug!(count = n, w, h, "chasers laid out");
    }

    pub fn render(&mut self, frame: &mut [u8], w: usize, h: usize, time: f32, speed: f32) {
        if w == 0 || h == 0 {
            return;
        }
        if self.dims != (w, h) || self.chasers.len() != self.count() {
            self.reinit(w, h);
        }

        let thickness = (self.settings.thickness as f32).max((w + h) as f32 * 0.002) as i32;
        let half = thickness / 2;
        let line = self.settings.line;

        for (k, c) in self.chasers.iter_mut().enumerate() {
            let t = (time * speed + k as f32) * 50.0;
            let x = ((w / 2) as f32
                + c.path_x
                    * ((t * 0.1102 * c.coeff[0] + 10.0).cos() + (t * 0.1312 * c.coeff[1] + 20.0).cos()))
                as i32;
            let y = ((h / 2) as f32
                + c.path_y
                    * ((t * 0.1204 * c.coeff[2] + 40.0).cos() + (t * 0.1715 * c.coeff[3] + 30.0).cos()))
                as i32;
            let x = x.clamp(0, w as i32 - 1);
            let y = y.clamp(0, h as i32 - 1);

            for offset in -half..=half {
                stroke(frame, w, h, line, c.prev, (x, y), offset, 255);
                if offset == -half || offset == half {
                    stroke(frame, w, h, line, c.prev, (x, y), offset - 1, EDGE_ALPHA);
                    stroke(frame, w, h, line, c.prev, (x, y), offset + 1, EDGE_ALPHA);
                }
            }
            c.prev = (x, y);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn stroke(
    frame: &mut [u8],
    w: usize,
    h: usize,
    line: ChaserLine,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    dy: i32,
    alpha: u8,
) {
    match line {
        ChaserLine::Bresenham => {
            draw_line(frame, w, h, (x0, y0 + dy), (x1, y1 + dy), [255, 255, 255, alpha]);
        }
        ChaserLine::Wu => draw_line_wu(
            frame,
            w,
            h,
            (x0 as f32, (y0 + dy) as f32),
            (x1 as f32, (y1 + dy) as f32),
            WHITE,
            alpha as f32 / 255.0,
        ),
        ChaserLine::GuptaSproull => draw_line_gupta_sproull(
            frame,
            w,
            h,
            (x0, y0 + dy),
            (x1, y1 + dy),
            WHITE,
            alpha as f32 / 255.0,
        ),
    }
}

impl Effect for ChaserField {
    fn name(&self) -> &'static str {
        "chasers"
    }

    fn render(&mut self, ctx: &EffectCtx, frame: &mut [u8]) {
        ChaserField::render(self, frame, ctx.w, ctx.h, ctx.time, ctx.speed);
    }
}
