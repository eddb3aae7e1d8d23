//! Trait definition for performance calculators.
//!
//! The ruleset calls a `PerformanceCalculator` after every recorded judgement.
//! Calculators are pure from the ruleset's point of view: they get a
//! normalized parameter struct and return a rating, never an error.

use crate::models::mods::Mods;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Error type for calculator setup failures.
#[derive(Debug, Clone, Error)]
pub enum CalcError {
    /// The beatmap data is invalid or missing.
    #[error("Invalid beatmap: {0}")]
    InvalidBeatmap(String),
}

/// Play state handed to the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreParams {
    /// Game mode id, 0 for osu!standard.
    pub mode: u8,
    pub mods: Mods,
    pub max_combo: u32,
    /// Accuracy in percent.
    pub accuracy: f64,
    pub misses: u32,
    /// Objects judged so far; 0 means the whole map.
    pub passed_objects: u32,
}

impl ScoreParams {
    /// Brings every field into the range the calculator accepts.
    pub fn clamped(mut self, total_objects: u32) -> Self {
        self.accuracy = if self.accuracy.is_finite() {
            self.accuracy.clamp(0.0, 100.0)
        } else {
            100.0
        };
        self.passed_objects = self.passed_objects.min(total_objects);
        if self.passed_objects > 0 {
            self.misses = self.misses.min(self.passed_objects);
        }
        self
    }
}

/// Rating returned by a calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceResult {
    pub pp: f64,
    pub stars: f64,
}

/// Trait that all performance calculators must implement.
pub trait PerformanceCalculator: Send + Sync + Debug {
    /// Unique identifier (e.g., "osu", "none").
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Version string.
    fn version(&self) -> &str {
        "v1.0"
    }

    /// Rates a (partial) play. Input has already been clamped.
    fn calculate(&self, params: &ScoreParams) -> PerformanceResult;

    /// Returns a full calculator ID including version.
    fn full_id(&self) -> String {
        format!("{}_{}", self.id(), self.version())
    }
}
