use super::{ComboState, ScoreProcessor};
use crate::models::engine::{Beatmap, DifficultyContext};
use crate::models::stats::{ComboResult, HitResult};

/// Past this combo each extra combo step is worth half a step of bonus.
const COMBO_BONUS_THRESHOLD: u32 = 1000;

/// Stable scoring: base value plus a combo bonus scaled by map difficulty and
/// the mod multiplier.
#[derive(Debug, Clone)]
pub struct LegacyScore {
    combo: ComboState,
    score: i64,
    difficulty_multiplier: f64,
    mod_multiplier: f64,
}

impl LegacyScore {
    pub fn new(beatmap: &Beatmap, ctx: &DifficultyContext) -> Self {
        Self::with_multipliers(difficulty_multiplier(beatmap), ctx.score_multiplier())
    }

    pub fn with_multipliers(difficulty_multiplier: f64, mod_multiplier: f64) -> Self {
        Self {
            combo: ComboState::new(),
            score: 0,
            difficulty_multiplier,
            mod_multiplier,
        }
    }
}

/// Stable's map difficulty points, 0 to 5ish.
pub fn difficulty_multiplier(beatmap: &Beatmap) -> f64 {
    let base = beatmap.difficulty;
    let drain_seconds = beatmap.drain_time() / 1000.0;
    let density = if drain_seconds > 0.0 {
        (beatmap.objects.len() as f64 / drain_seconds * 8.0).clamp(0.0, 16.0)
    } else {
        16.0
    };

    ((base.hp + base.cs + base.od + density) / 38.0 * 5.0).round()
}

fn combo_factor(combo: u32) -> f64 {
    if combo <= COMBO_BONUS_THRESHOLD {
        f64::from(combo)
    } else {
        f64::from(COMBO_BONUS_THRESHOLD) + f64::from(combo - COMBO_BONUS_THRESHOLD) / 2.0
    }
}

impl ScoreProcessor for LegacyScore {
    fn apply_judgement(&mut self, result: HitResult, combo: ComboResult) {
        self.combo.apply(combo);

        let value = result.score_value();
        if result.is_base_hit() {
            let bonus = value as f64
                * combo_factor(self.combo.combo.saturating_sub(1))
                * self.difficulty_multiplier
                * self.mod_multiplier
                / 25.0;
            self.score += value + bonus.max(0.0) as i64;
        } else {
            self.score += value;
        }
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn combo_state(&self) -> ComboState {
        self.combo
    }
}
