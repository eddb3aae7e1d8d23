//! Per-player button edge tracking.

use crate::models::engine::CursorSample;

/// Remembers a player's button levels and turns them into press edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    left: bool,
    right: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buttons that went down since the previous sample (0 to 2).
    ///
    /// Updates the stored button levels.
    pub fn presses(&mut self, sample: &CursorSample) -> usize {
        let left_down = sample.left && !self.left;
        let right_down = sample.right && !self.right;

        self.left = sample.left;
        self.right = sample.right;

        usize::from(left_down) + usize::from(right_down)
    }
}
