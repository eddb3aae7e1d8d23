//! Per-player resolved difficulty.
//!
//! A `DifficultyContext` is built once per player from the map's base values
//! and the player's modifiers, then handed by reference to every judge and
//! processor call. Nothing in the engine reads difficulty from anywhere else.

use super::hit_window::HitWindow;
use crate::models::mods::Mods;
use serde::{Deserialize, Serialize};

/// Map difficulty as written in the beatmap, before modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseDifficulty {
    pub hp: f64,
    pub cs: f64,
    pub od: f64,
    pub ar: f64,
}

impl Default for BaseDifficulty {
    fn default() -> Self {
        Self {
            hp: 5.0,
            cs: 5.0,
            od: 5.0,
            ar: 5.0,
        }
    }
}

/// Linear interpolation used all over osu!: `min` at 0, `mid` at 5, `max` at 10.
pub fn difficulty_range(value: f64, min: f64, mid: f64, max: f64) -> f64 {
    if value > 5.0 {
        mid + (max - mid) * (value - 5.0) / 5.0
    } else if value < 5.0 {
        mid - (mid - min) * (5.0 - value) / 5.0
    } else {
        mid
    }
}

/// Resolved difficulty of one player.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyContext {
    pub mods: Mods,
    pub hp: f64,
    pub cs: f64,
    pub od: f64,
    pub ar: f64,
    /// Playback rate (1.5 under DT, 0.75 under HT).
    pub speed: f64,
    /// Circle radius in osu! pixels.
    pub circle_radius: f64,
    /// Radius inside which a held slider keeps tracking.
    pub follow_radius: f64,
    /// Approach time (ms) before an object's start time.
    pub preempt: f64,
    pub hit_window: HitWindow,
    /// Rotations per second a spinner requires for a 300.
    pub spinner_rps: f64,
}

impl DifficultyContext {
    pub fn new(base: BaseDifficulty, mods: Mods) -> Self {
        let mut hp = base.hp;
        let mut cs = base.cs;
        let mut od = base.od;
        let mut ar = base.ar;

        if mods.active(Mods::HARD_ROCK) {
            hp = (hp * 1.4).min(10.0);
            cs = (cs * 1.3).min(10.0);
            od = (od * 1.4).min(10.0);
            ar = (ar * 1.4).min(10.0);
        }

        if mods.active(Mods::EASY) {
            hp *= 0.5;
            cs *= 0.5;
            od *= 0.5;
            ar *= 0.5;
        }

        let speed = if mods.active(Mods::DOUBLE_TIME) {
            1.5
        } else if mods.active(Mods::HALF_TIME) {
            0.75
        } else {
            1.0
        };

        let circle_radius = (54.4 - 4.48 * cs).max(1.0);

        Self {
            mods,
            hp,
            cs,
            od,
            ar,
            speed,
            circle_radius,
            follow_radius: circle_radius * 2.4,
            preempt: difficulty_range(ar, 1800.0, 1200.0, 450.0),
            hit_window: HitWindow::from_osu_od(od),
            spinner_rps: difficulty_range(od, 3.0, 5.0, 7.5),
        }
    }

    pub fn check_mod_active(&self, mods: Mods) -> bool {
        self.mods.active(mods)
    }

    /// Scale factor applied to stack offsets.
    pub fn object_scale(&self) -> f64 {
        (1.0 - 0.7 * (self.cs - 5.0) / 5.0) / 2.0
    }

    /// Mods that keep the player alive at 0 HP.
    pub fn prevents_fail(&self) -> bool {
        self.mods
            .active(Mods::NO_FAIL | Mods::RELAX | Mods::AUTOPILOT | Mods::AUTOPLAY)
    }

    /// Hidden or Flashlight: the silver grades apply.
    pub fn is_visually_harder(&self) -> bool {
        self.mods.active(Mods::HIDDEN | Mods::FLASHLIGHT)
    }

    /// Legacy score multiplier of the active mods.
    pub fn score_multiplier(&self) -> f64 {
        let mut multiplier = 1.0;
        if self.mods.active(Mods::NO_FAIL) {
            multiplier *= 0.5;
        }
        if self.mods.active(Mods::EASY) {
            multiplier *= 0.5;
        }
        if self.mods.active(Mods::HALF_TIME) {
            multiplier *= 0.3;
        }
        if self.mods.active(Mods::HIDDEN) {
            multiplier *= 1.06;
        }
        if self.mods.active(Mods::HARD_ROCK) {
            multiplier *= 1.06;
        }
        if self.mods.active(Mods::DOUBLE_TIME) {
            multiplier *= 1.12;
        }
        if self.mods.active(Mods::FLASHLIGHT) {
            multiplier *= 1.12;
        }
        if self.mods.active(Mods::SPUN_OUT) {
            multiplier *= 0.9;
        }
        if self.mods.active(Mods::RELAX | Mods::AUTOPILOT) {
            multiplier = 0.0;
        }
        multiplier
    }
}
