//! Score processors.
//!
//! Two rule sets share one trait: the stable `LegacyScore` (default) and the
//! normalized `RebalancedScore` used when Score V2 is active.

mod legacy;
mod rebalanced;

pub use legacy::LegacyScore;
pub use rebalanced::RebalancedScore;

use crate::models::engine::{Beatmap, DifficultyContext};
use crate::models::mods::Mods;
use crate::models::stats::{ComboResult, HitResult};
use std::fmt::Debug;

/// Running combo of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboState {
    pub combo: u32,
    pub max_combo: u32,
    /// False forever after the first combo reset.
    pub perfect: bool,
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            combo: 0,
            max_combo: 0,
            perfect: true,
        }
    }
}

impl ComboState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, combo: ComboResult) {
        match combo {
            ComboResult::Reset => {
                self.combo = 0;
                self.perfect = false;
            }
            ComboResult::Hold => {}
            ComboResult::Increase => {
                self.combo += 1;
                self.max_combo = self.max_combo.max(self.combo);
            }
        }
    }
}

/// A judgement after modifier overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjusted {
    pub result: HitResult,
    pub combo: ComboResult,
    /// Set when Sudden Death or Perfect turned the judgement into a fail.
    pub forced_fail: bool,
}

/// Converts judgements into score and combo.
pub trait ScoreProcessor: Send + Debug {
    /// Applies modifier-driven overrides before the judgement is recorded.
    ///
    /// Sudden Death fails on any combo reset, Perfect additionally on any
    /// base hit below 300. The failing judgement becomes a miss.
    fn adjust_for_modifiers(
        &self,
        result: HitResult,
        combo: ComboResult,
        ctx: &DifficultyContext,
    ) -> Adjusted {
        let sudden_death =
            ctx.check_mod_active(Mods::SUDDEN_DEATH | Mods::PERFECT) && combo == ComboResult::Reset;
        let perfect = ctx.check_mod_active(Mods::PERFECT)
            && result.is_base()
            && result != HitResult::Hit300;

        if !(sudden_death || perfect) {
            return Adjusted {
                result,
                combo,
                forced_fail: false,
            };
        }

        let result = if result.is_base() {
            HitResult::Miss
        } else if result.is_slider_part() {
            HitResult::SliderMiss
        } else {
            result
        };

        Adjusted {
            result,
            combo: ComboResult::Reset,
            forced_fail: true,
        }
    }

    fn apply_judgement(&mut self, result: HitResult, combo: ComboResult);

    fn score(&self) -> i64;

    fn combo_state(&self) -> ComboState;

    fn combo(&self) -> u32 {
        self.combo_state().combo
    }

    fn max_combo(&self) -> u32 {
        self.combo_state().max_combo
    }
}

/// Picks the processor matching the player's modifiers.
pub fn processor_for(beatmap: &Beatmap, ctx: &DifficultyContext) -> Box<dyn ScoreProcessor> {
    if ctx.check_mod_active(Mods::SCORE_V2) {
        Box::new(RebalancedScore::new(beatmap, ctx))
    } else {
        Box::new(LegacyScore::new(beatmap, ctx))
    }
}
