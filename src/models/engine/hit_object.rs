//! Immutable hit-object descriptions.
//!
//! These are produced by the beatmap loader and only ever read by the engine.

use crate::models::mods::Mods;
use serde::{Deserialize, Serialize};

/// Playfield height in osu! pixels, used for the Hard Rock flip.
pub const PLAYFIELD_HEIGHT: f64 = 384.0;
/// Playfield width in osu! pixels.
pub const PLAYFIELD_WIDTH: f64 = 512.0;

/// 2D point in osu! pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        Vec2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Angle of `self - center` in radians.
    pub fn angle_around(self, center: Vec2) -> f64 {
        (self.y - center.y).atan2(self.x - center.x)
    }

    pub fn flip_y(self) -> Vec2 {
        Vec2::new(self.x, PLAYFIELD_HEIGHT - self.y)
    }
}

/// Kind-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HitObjectKind {
    Circle,
    Slider {
        /// Polyline the ball follows on the first span, starting at the head.
        path: Vec<Vec2>,
        /// Number of traversals of the path (repeats + 1).
        span_count: u32,
        /// Time (ms) between two ticks; zero or negative disables ticks.
        tick_interval: f64,
    },
    Spinner,
}

/// A single hit object as read from the beatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitObjectSpec {
    pub kind: HitObjectKind,
    pub start_time: f64,
    pub end_time: f64,
    /// Unstacked head position.
    pub position: Vec2,
    pub new_combo: bool,
    /// Stack depth without Hard Rock.
    pub stack_index: u32,
    /// Stack depth with Hard Rock (stacking is recomputed on the flipped field).
    pub stack_index_hr: u32,
}

impl HitObjectSpec {
    pub fn circle(start_time: f64, position: Vec2, new_combo: bool) -> Self {
        Self {
            kind: HitObjectKind::Circle,
            start_time,
            end_time: start_time,
            position,
            new_combo,
            stack_index: 0,
            stack_index_hr: 0,
        }
    }

    pub fn slider(
        start_time: f64,
        end_time: f64,
        path: Vec<Vec2>,
        span_count: u32,
        tick_interval: f64,
        new_combo: bool,
    ) -> Self {
        let position = path.first().copied().unwrap_or_default();
        Self {
            kind: HitObjectKind::Slider {
                path,
                span_count,
                tick_interval,
            },
            start_time,
            end_time,
            position,
            new_combo,
            stack_index: 0,
            stack_index_hr: 0,
        }
    }

    pub fn spinner(start_time: f64, end_time: f64, new_combo: bool) -> Self {
        Self {
            kind: HitObjectKind::Spinner,
            start_time,
            end_time,
            position: Vec2::new(PLAYFIELD_WIDTH / 2.0, PLAYFIELD_HEIGHT / 2.0),
            new_combo,
            stack_index: 0,
            stack_index_hr: 0,
        }
    }

    pub fn with_stack(mut self, stack_index: u32, stack_index_hr: u32) -> Self {
        self.stack_index = stack_index;
        self.stack_index_hr = stack_index_hr;
        self
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.kind, HitObjectKind::Circle)
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner)
    }

    /// Object end, never before its start.
    pub fn resolved_end_time(&self) -> f64 {
        self.end_time.max(self.start_time)
    }

    pub fn stack_index_for(&self, mods: Mods) -> u32 {
        if mods.active(Mods::HARD_ROCK) {
            self.stack_index_hr
        } else {
            self.stack_index
        }
    }

    fn stack_offset(&self, mods: Mods, scale: f64) -> Vec2 {
        let offset = f64::from(self.stack_index_for(mods)) * scale * -6.4;
        Vec2::new(offset, offset)
    }

    /// Applies the mod flip and the stack offset to a raw playfield point.
    pub fn transform(&self, point: Vec2, mods: Mods, scale: f64) -> Vec2 {
        let point = if mods.active(Mods::HARD_ROCK) {
            point.flip_y()
        } else {
            point
        };
        if self.is_spinner() {
            return point;
        }
        let offset = self.stack_offset(mods, scale);
        Vec2::new(point.x + offset.x, point.y + offset.y)
    }

    /// Head position as seen by a player with `mods`.
    pub fn stacked_position(&self, mods: Mods, scale: f64) -> Vec2 {
        self.transform(self.position, mods, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_offset_moves_up_left() {
        let spec = HitObjectSpec::circle(0.0, Vec2::new(100.0, 100.0), false).with_stack(2, 0);
        let pos = spec.stacked_position(Mods::NONE, 0.5);
        assert!((pos.x - 93.6).abs() < 1e-9);
        assert!((pos.y - 93.6).abs() < 1e-9);
    }

    #[test]
    fn test_hard_rock_flip_uses_hr_stack() {
        let spec = HitObjectSpec::circle(0.0, Vec2::new(100.0, 100.0), false).with_stack(2, 0);
        let pos = spec.stacked_position(Mods::HARD_ROCK, 0.5);
        assert_eq!(pos, Vec2::new(100.0, 284.0));
    }

    #[test]
    fn test_negative_duration_resolves_to_start() {
        let spec = HitObjectSpec::spinner(1000.0, 900.0, true);
        assert_eq!(spec.resolved_end_time(), 1000.0);
    }
}
