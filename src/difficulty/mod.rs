//! Performance rating.
//!
//! The ruleset only knows the `PerformanceCalculator` contract; the osu!
//! implementation is backed by rosu-pp.

pub mod builtin;
pub mod calculator;

pub use builtin::{NullCalculator, RosuCalculator};
pub use calculator::{CalcError, PerformanceCalculator, PerformanceResult, ScoreParams};
