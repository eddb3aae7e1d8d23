use super::{ComboState, ScoreProcessor};
use crate::logic::judge::{SliderEventKind, slider_events};
use crate::models::engine::{Beatmap, DifficultyContext, HitObjectKind};
use crate::models::stats::{ComboResult, HitResult};

/// Score of a perfect play, before the mod multiplier.
pub const MAX_SCORE: f64 = 1_000_000.0;
/// Combo at which the combo multiplier stops growing.
const COMBO_CAP: u32 = 400;

/// Additive, normalized scoring: every judgement adds a weighted value and the
/// total is scaled against the value of a perfect play. Spinner bonus spins
/// are added on top of the normalized part.
#[derive(Debug, Clone)]
pub struct RebalancedScore {
    combo: ComboState,
    raw: f64,
    max_raw: f64,
    bonus: i64,
    mod_multiplier: f64,
}

impl RebalancedScore {
    pub fn new(beatmap: &Beatmap, ctx: &DifficultyContext) -> Self {
        Self {
            combo: ComboState::new(),
            raw: 0.0,
            max_raw: perfect_raw(beatmap),
            bonus: 0,
            mod_multiplier: ctx.score_multiplier(),
        }
    }
}

/// 1.0 at no combo, 2.0 from `COMBO_CAP` on.
fn combo_multiplier(combo: u32) -> f64 {
    1.0 + f64::from(combo.min(COMBO_CAP)) / f64::from(COMBO_CAP)
}

fn weighted_value(result: HitResult, combo: u32) -> f64 {
    let value = result.score_value() as f64;
    if result.is_base_hit() {
        value * combo_multiplier(combo)
    } else if result.is_slider_part() {
        value
    } else {
        0.0
    }
}

/// Raw value of an all-300 full-combo play.
fn perfect_raw(beatmap: &Beatmap) -> f64 {
    let mut combo = ComboState::new();
    let mut raw = 0.0;

    let mut add = |result: HitResult, step: ComboResult| {
        combo.apply(step);
        raw += weighted_value(result, combo.combo);
    };

    for object in &beatmap.objects {
        match object.kind {
            HitObjectKind::Circle | HitObjectKind::Spinner => {
                add(HitResult::Hit300, ComboResult::Increase);
            }
            HitObjectKind::Slider { .. } => {
                add(HitResult::SliderStart, ComboResult::Increase);
                for event in slider_events(object) {
                    let part = match event.kind {
                        SliderEventKind::Tick => HitResult::SliderPoint,
                        SliderEventKind::Repeat => HitResult::SliderRepeat,
                        SliderEventKind::Tail => HitResult::SliderEnd,
                    };
                    add(part, ComboResult::Increase);
                }
                add(HitResult::Hit300, ComboResult::Hold);
            }
        }
    }

    raw
}

impl ScoreProcessor for RebalancedScore {
    fn apply_judgement(&mut self, result: HitResult, combo: ComboResult) {
        self.combo.apply(combo);

        match result {
            HitResult::SpinnerBonus => self.bonus += result.score_value(),
            _ => self.raw += weighted_value(result, self.combo.combo),
        }
    }

    fn score(&self) -> i64 {
        let normalized = if self.max_raw > 0.0 {
            (self.raw / self.max_raw).min(1.0) * MAX_SCORE * self.mod_multiplier
        } else {
            0.0
        };
        normalized.round() as i64 + self.bonus
    }

    fn combo_state(&self) -> ComboState {
        self.combo
    }
}
