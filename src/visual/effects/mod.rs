mod chaser;
mod tunnel;

pub use chaser::{ChaserField, MAX_CHASERS};
pub use tunnel::{TunnelRing, TUNNEL_COLOR};

/// Per-pass inputs handed to every overlay effect.
#[derive(Clone, Copy, Debug)]
pub struct EffectCtx {
    pub w: usize,
    pub h: usize,
    /// Accumulated animation time.
    pub time: f32,
    pub speed: f32,
    pub spike: bool,
    pub now_ms: u64,
}

/// An overlay drawn straight into the composed frame after the scope.
pub trait Effect: Send {
    fn name(&self) -> &'static str;
    fn render(&mut self, ctx: &EffectCtx, frame: &mut [u8]);
}
