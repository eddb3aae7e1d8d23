//! osu!standard gameplay ruleset.
//!
//! Judges cursor input against the hit objects of a beatmap for any number of
//! players at once, and keeps each player's score, combo, accuracy, grade,
//! health and performance rating up to date.

pub mod difficulty;
pub mod error;
pub mod logic;
pub mod models;
pub mod system;

pub use error::{Result, RulesetError};
pub use logic::ruleset::{HitEvent, PlayerId, PlayerSetup, Ruleset};
