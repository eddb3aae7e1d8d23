//! Published per-player score snapshot.

use super::mods::Mods;
use super::stats::{Grade, HitStats};
use serde::{Deserialize, Serialize};

/// Value snapshot of a player's play state.
///
/// Handed out by copy; the ruleset keeps its own instance and never shares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub player: String,
    pub mods: Mods,
    pub score: i64,
    pub accuracy: f64,
    pub grade: Grade,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_combo: bool,
    pub stats: HitStats,
    pub pp: f64,
    pub stars: f64,
    pub failed: bool,
}

impl Score {
    pub fn new(player: impl Into<String>, mods: Mods) -> Self {
        Self {
            player: player.into(),
            mods,
            score: 0,
            accuracy: 100.0,
            grade: Grade::None,
            combo: 0,
            max_combo: 0,
            perfect_combo: true,
            stats: HitStats::new(),
            pp: 0.0,
            stars: 0.0,
            failed: false,
        }
    }
}
