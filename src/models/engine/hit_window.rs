//! Definitions and constructors for hit window timing thresholds.

use crate::models::stats::HitResult;

/// Half-widths (ms) of the three nested hit-quality bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitWindow {
    pub hit_300_ms: f64,
    pub hit_100_ms: f64,
    pub hit_50_ms: f64,
}

impl HitWindow {
    /// Creates a window based on osu! Overall Difficulty.
    pub fn from_osu_od(od: f64) -> Self {
        Self {
            hit_300_ms: 80.0 - 6.0 * od,  // 300 window
            hit_100_ms: 140.0 - 8.0 * od, // 100 window
            hit_50_ms: 200.0 - 10.0 * od, // 50 window
        }
    }

    /// Tier for a press `timing_diff_ms` away from the object's start.
    ///
    /// Anything outside the 50 band is a miss; whether such a press is
    /// allowed at all is decided by the hittable range, not here.
    pub fn judge(&self, timing_diff_ms: f64) -> HitResult {
        let abs_diff = timing_diff_ms.abs();

        if abs_diff < self.hit_300_ms {
            HitResult::Hit300
        } else if abs_diff < self.hit_100_ms {
            HitResult::Hit100
        } else if abs_diff < self.hit_50_ms {
            HitResult::Hit50
        } else {
            HitResult::Miss
        }
    }

    /// True once `time` is past the late edge of the 50 band for an object
    /// starting at `start_time`.
    pub fn is_expired(&self, start_time: f64, time: f64) -> bool {
        time > start_time + self.hit_50_ms
    }
}
