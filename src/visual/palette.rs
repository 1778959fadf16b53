//! Indexed palettes: recipes, color-space helpers and the crossfade engine.
//!
//! The canvas red channel is the palette index. Recipes shape the first 64
//! entries as a gradient and fill the rest with a flat or fading tail.

use crate::parallel::for_each_pixel;

pub const PALETTE_SIZE: usize = 256;
pub const MAX_COLOR: u8 = 63;
const GRADIENT_SIZE: usize = 64;
const BRIGHTNESS_THRESHOLD: f32 = 150.0;

pub type Rgb = [u8; 3];
pub type PaletteTable = [Rgb; PALETTE_SIZE];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Degrees, 0..360.
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

pub fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

pub fn rgb_to_hsl([r, g, b]: Rgb) -> Hsl {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta == 0.0 {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let mut h = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }
    Hsl { h, s, l }
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let (r, g, b) = if hsl.s == 0.0 {
        (hsl.l, hsl.l, hsl.l)
    } else {
        let q = if hsl.l < 0.5 {
            hsl.l * (1.0 + hsl.s)
        } else {
            hsl.l + hsl.s - hsl.l * hsl.s
        };
        let p = 2.0 * hsl.l - q;
        let h = hsl.h / 360.0;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Keeps saturation and lightness, replaces the hue (degrees, wrapped).
pub fn change_hue(rgb: Rgb, new_hue: f32) -> Rgb {
    let mut hsl = rgb_to_hsl(rgb);
    hsl.h = new_hue % 360.0;
    hsl_to_rgb(hsl)
}

/// Brightens dark values, capped at [`MAX_COLOR`]; bright values pass through.
pub fn apply_brightness(value: f32, factor: f32) -> u8 {
    if value < BRIGHTNESS_THRESHOLD {
        (value * factor).min(MAX_COLOR as f32) as u8
    } else {
        value as u8
    }
}

pub fn hue_rotation_matrix(hue_deg: f32) -> [[f32; 3]; 3] {
    let (s, c) = hue_deg.to_radians().sin_cos();
    [
        [
            0.213 + c * 0.787 - s * 0.213,
            0.715 - c * 0.715 - s * 0.715,
            0.072 - c * 0.072 + s * 0.928,
        ],
        [
            0.213 - c * 0.213 + s * 0.143,
            0.715 + c * 0.285 + s * 0.140,
            0.072 - c * 0.072 - s * 0.283,
        ],
        [
            0.213 - c * 0.213 - s * 0.787,
            0.715 - c * 0.715 + s * 0.715,
            0.072 + c * 0.928 + s * 0.072,
        ],
    ]
}

pub fn shift_hue([r, g, b]: Rgb, m: &[[f32; 3]; 3]) -> Rgb {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let row = |k: usize| (r * m[k][0] + g * m[k][1] + b * m[k][2]).clamp(0.0, 255.0) as u8;
    [row(0), row(1), row(2)]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recipe {
    PurpleMajik,
    GoldenSunburst,
    GreenLanternUltima,
    Ice,
    Aurora,
    /// Purple gradient pushed through the hue-rotation matrix.
    HueRotated { hue_deg: f32, brightness: f32 },
    /// Purple gradient with its HSL hue replaced.
    HueReplaced { hue_deg: f32 },
}

impl Recipe {
    pub fn name(self) -> &'static str {
        match self {
            Self::PurpleMajik => "purple majik",
            Self::GoldenSunburst => "golden sunburst",
            Self::GreenLanternUltima => "green lantern ultima",
            Self::Ice => "ice",
            Self::Aurora => "aurora",
            Self::HueRotated { .. } => "hue rotated",
            Self::HueReplaced { .. } => "hue replaced",
        }
    }

    pub fn random(rng: &mut fastrand::Rng) -> Self {
        match rng.u8(0..7) {
            0 => Self::PurpleMajik,
            1 => Self::GoldenSunburst,
            2 => Self::GreenLanternUltima,
            3 => Self::Ice,
            4 => Self::Aurora,
            5 => Self::HueRotated {
                hue_deg: rng.f32() * 360.0,
                brightness: 1.1,
            },
            _ => Self::HueReplaced {
                hue_deg: rng.f32() * 360.0,
            },
        }
    }

    pub fn fill(self, table: &mut PaletteTable) {
        let max = MAX_COLOR;
        for (a, entry) in table.iter_mut().enumerate() {
            let af = a as f32;
            let sq = (a * a / 64) as f32;
            let low = a < GRADIENT_SIZE;
            *entry = match self {
                Self::PurpleMajik if low => purple(a),
                Self::PurpleMajik => [max, max, max],
                Self::GoldenSunburst if low => [
                    apply_brightness(af, 1.08),
                    apply_brightness(sq, 1.08),
                    0,
                ],
                Self::GoldenSunburst => [max, max, 0],
                Self::GreenLanternUltima if low => [
                    ((af.sqrt() * 8.0) as u8).min(a as u8),
                    a as u8 + 10,
                    (sq as u8).min(a as u8),
                ],
                Self::GreenLanternUltima => {
                    let fade = ((PALETTE_SIZE - a) * max as usize / (PALETTE_SIZE - 92)) as u8;
                    [fade, fade, fade]
                }
                Self::Ice if low => [sq as u8, a as u8, (af.sqrt() * 8.0).max(1.0) as u8],
                Self::Ice => [a.min(100) as u8, 180, 255],
                Self::Aurora if low => [
                    apply_brightness(af.min(45.0), 1.1),
                    apply_brightness(af.sqrt().trunc(), 1.18 * 2.5),
                    apply_brightness((a * a / 64 + a) as f32, 1.18 * 1.125),
                ],
                Self::Aurora => [5, max, max],
                Self::HueRotated { hue_deg, brightness } if low => {
                    let m = hue_rotation_matrix(hue_deg);
                    let lift = |v: f32| (v * brightness).min(max as f32) as u8;
                    shift_hue([lift(af), lift((a * a) as f32 / 64.0), lift(af.sqrt() * 8.0)], &m)
                }
                Self::HueRotated { .. } => [max, max, max],
                Self::HueReplaced { hue_deg } if low => change_hue(purple(a), hue_deg),
                Self::HueReplaced { .. } => [max, max, max],
            };
        }
    }
}

fn purple(a: usize) -> Rgb {
    [a as u8, (a * a / 64) as u8, ((a as f32).sqrt() * 8.0) as u8]
}

/// Palette state machine: `current` drives lookups until a regeneration,
/// then `old` -> `target` crossfades over `total` applications.
pub struct PaletteEngine {
    current: PaletteTable,
    old: PaletteTable,
    target: PaletteTable,
    step: u32,
    total: u32,
    transitioning: bool,
    last_regen_ms: Option<u64>,
    cooldown_ms: u64,
    generation: u64,
    recipe: Option<Recipe>,
    rng: fastrand::Rng,
}

impl PaletteEngine {
    pub fn new(seed: u64, transition_steps: u32, cooldown_ms: u64) -> Self {
        Self {
            current: [[0; 3]; PALETTE_SIZE],
            old: [[0; 3]; PALETTE_SIZE],
            target: [[0; 3]; PALETTE_SIZE],
            step: 0,
            total: transition_steps.max(1),
            transitioning: false,
            last_regen_ms: None,
            cooldown_ms,
            generation: 0,
            recipe: None,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Zero is ignored.
    pub fn set_transition_steps(&mut self, steps: u32) {
        if steps > 0 && !self.transitioning {
            self.total = steps;
        }
    }

    pub fn current(&self) -> &PaletteTable {
        &self.current
    }

    pub fn old(&self) -> &PaletteTable {
        &self.old
    }

    pub fn target(&self) -> &PaletteTable {
        &self.target
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn total_steps(&self) -> u32 {
        self.total
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// How many palettes have been generated so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn recipe(&self) -> Option<Recipe> {
        self.recipe
    }

    /// Picks a random recipe and starts crossfading to it.
    pub fn generate_palette(&mut self) -> Option<Recipe> {
        let recipe = Recipe::random(&mut self.rng);
        self.start_transition_to(recipe).then_some(recipe)
    }

    /// Snapshots `current` as `old`, fills `target` from `recipe` and starts
    /// the crossfade. Returns false while a crossfade is already running.
    pub fn start_transition_to(&mut self, recipe: Recipe) -> bool {
        if self.transitioning {
            return false;
        }
        self.old = self.current;
        recipe.fill(&mut self.target);
        self.step = 0;
        self.transitioning = true;
        self.generation += 1;
        self.recipe = Some(recipe);
        tracing::debug!(recipe = recipe.name(), generation = self.generation, "palette regenerated");
        true
    }

    /// Regenerates on first use, or on a spike once the cooldown has passed.
    pub fn maybe_regenerate(&mut self, spike: bool, now_ms: u64) -> bool {
        let due = match self.last_regen_ms {
            None => true,
            Some(last) => spike && now_ms.saturating_sub(last) > self.cooldown_ms,
        };
        if !due || self.transitioning {
            return false;
        }
        if self.generate_palette().is_some() {
            self.last_regen_ms = Some(now_ms);
            return true;
        }
        false
    }

    /// Color an index maps to at the current transition step.
    pub fn color_at(&self, index: u8) -> Rgb {
        let i = index as usize;
        if !self.transitioning {
            return self.current[i];
        }
        let t = self.progress();
        blend(self.old[i], self.target[i], t)
    }

    fn progress(&self) -> f32 {
        (self.step as f32 / self.total as f32).min(1.0)
    }

    /// Moves the crossfade one application forward, finalizing at `total`.
    fn advance(&mut self) {
        if !self.transitioning {
            return;
        }
        if self.step >= self.total {
            self.transitioning = false;
            self.current = self.target;
        } else {
            self.step += 1;
        }
    }

    /// Maps every pixel through the palette by its red channel; alpha becomes opaque.
    pub fn apply_palette_to_canvas(&mut self, canvas: &mut [u8], spike: bool, now_ms: u64) {
        self.maybe_regenerate(spike, now_ms);

        if self.transitioning {
            let t = self.progress();
            let (old, target) = (&self.old, &self.target);
            for_each_pixel(canvas, |_, px| {
                let i = px[0] as usize;
                let [r, g, b] = blend(old[i], target[i], t);
                px[0] = r;
                px[1] = g;
                px[2] = b;
                px[3] = 255;
            });
            self.advance();
        } else {
            let current = &self.current;
            for_each_pixel(canvas, |_, px| {
                let [r, g, b] = current[px[0] as usize];
                px[0] = r;
                px[1] = g;
                px[2] = b;
                px[3] = 255;
            });
        }
    }
}

#[inline]
fn blend(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let it = 1.0 - t;
    [
        (it * a[0] as f32 + t * b[0] as f32) as u8,
        (it * a[1] as f32 + t * b[1] as f32) as u8,
        (it * a[2] as f32 + t * b[2] as f32) as u8,
    ]
}
