//! Timestamped cursor input produced outside the engine.

use super::hit_object::Vec2;
use serde::{Deserialize, Serialize};

/// One cursor sample: where the cursor is and which buttons are down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorSample {
    /// Map time in milliseconds.
    pub time: f64,
    pub position: Vec2,
    pub left: bool,
    pub right: bool,
}

impl CursorSample {
    pub fn new(time: f64, position: Vec2, left: bool, right: bool) -> Self {
        Self {
            time,
            position,
            left,
            right,
        }
    }

    /// Sample with both buttons up.
    pub fn hover(time: f64, position: Vec2) -> Self {
        Self::new(time, position, false, false)
    }

    pub fn any_down(&self) -> bool {
        self.left || self.right
    }
}
