//! Node placement policy.
//!
//! Purely cosmetic: positions never affect graph semantics, but they are
//! deterministic so regenerated trees look the same every time. Each layer
//! owns a 400-unit horizontal band; roles within a layer sit at fixed
//! offsets from the band's left edge.

/// Horizontal distance between consecutive layers' bands.
pub const LAYER_STRIDE: f32 = 400.0;

/// Monotonic horizontal placement cursor, advanced once per layer and once
/// more before the terminal sinks.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutCursor {
    x: f32,
}

impl LayoutCursor {
    pub fn new() -> Self {
        Self { x: 0.0 }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn advance(&mut self) {
        self.x += LAYER_STRIDE;
    }

    /// Chain-head sources (Color layers) sit on the main row.
    pub fn chain_head(&self) -> (f32, f32) {
        (self.x, 0.0)
    }

    /// Footage sources feeding a blend stage, below the main chain.
    pub fn footage_row(&self) -> (f32, f32) {
        (self.x, -600.0)
    }

    /// Footage being UV-remapped, just under the main chain.
    pub fn uv_footage_row(&self) -> (f32, f32) {
        (self.x, -100.0)
    }

    /// UV pass source; shares the footage row.
    pub fn uv_source(&self) -> (f32, f32) {
        (self.x, -600.0)
    }

    pub fn uv_transform(&self) -> (f32, f32) {
        (self.x + 200.0, -600.0)
    }

    pub fn uv_tile(&self) -> (f32, f32) {
        (self.x + 200.0, -400.0)
    }

    pub fn uv_remap(&self) -> (f32, f32) {
        (self.x + 400.0, -300.0)
    }

    /// Blend stage (mix group, custom group, alpha-over) on the main row.
    pub fn blend_slot(&self) -> (f32, f32) {
        (self.x + 800.0, 0.0)
    }

    pub fn composite_sink(&self) -> (f32, f32) {
        (self.x + 400.0, 0.0)
    }

    pub fn viewer_sink(&self) -> (f32, f32) {
        (self.x + 400.0, -300.0)
    }
}
