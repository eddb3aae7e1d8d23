//! Ruleset configuration loaded from TOML.
//!
//! Every field has a default matching the osu! stable client, so an empty or
//! partial file is valid.

use crate::error::{Result, RulesetError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Thresholds of the grade ladder.
///
/// Ratios are `count_300 / judged`. A grade is reached when its ratio is
/// exceeded strictly; the "no miss" variants only apply with zero misses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeLadder {
    pub s_ratio: f64,
    /// Maximum share of 50s still allowing S.
    pub s_max_50_ratio: f64,
    pub a_ratio_no_miss: f64,
    pub a_ratio: f64,
    pub b_ratio_no_miss: f64,
    pub b_ratio: f64,
    pub c_ratio: f64,
}

impl Default for GradeLadder {
    fn default() -> Self {
        Self {
            s_ratio: 0.9,
            s_max_50_ratio: 0.01,
            a_ratio_no_miss: 0.8,
            a_ratio: 0.9,
            b_ratio_no_miss: 0.7,
            b_ratio: 0.8,
            c_ratio: 0.6,
        }
    }
}

/// Health processor constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// HP ceiling. The floor is always 0.
    pub max_hp: f64,
    /// HP restored when a recovery credit is spent.
    pub recovery_hp: f64,
    /// Recovery credits granted by the Easy modifier.
    pub easy_recoveries: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_hp: 200.0,
            recovery_hp: 160.0,
            easy_recoveries: 2,
        }
    }
}

/// Tunables of a ruleset session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesetConfig {
    /// Overlap tolerance (ms) under which two objects may be clicked out of order.
    pub tolerance_2b_ms: i64,
    /// Presses further than this (ms) from an object's start shake.
    pub hittable_range_ms: f64,
    pub grade: GradeLadder,
    pub health: HealthConfig,
    /// Log every judgement at info level in single-player sessions.
    pub log_hits: bool,
    /// Log the results table when the session ends.
    pub log_results: bool,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            tolerance_2b_ms: 3,
            hittable_range_ms: 400.0,
            grade: GradeLadder::default(),
            health: HealthConfig::default(),
            log_hits: true,
            log_results: true,
        }
    }
}

impl RulesetConfig {
    /// Loads a config file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}

/// Load a TOML file and deserialize it
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(data) => Ok(data),
        Err(e) => {
            log::error!("Failed to parse TOML file {:?}: {}", path, e);
            Err(RulesetError::Config(e.to_string()))
        }
    }
}
