//! Hit results and judgement types.
//!
//! This module defines the judgement vocabulary shared by the judges, the
//! score and health processors, and the published score snapshot.

use super::settings::GradeLadder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single judgement issued by a hit-object judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitResult {
    /// Nothing happened (no effect anywhere).
    Ignore,
    /// Click landed outside the object's reach. Feedback only.
    PositionalMiss,
    /// A slider part (head, tick, repeat, tail) was missed.
    SliderMiss,
    /// Missed object.
    Miss,
    Hit50,
    Hit100,
    Hit300,
    /// Slider head hit.
    SliderStart,
    /// Slider tick hit.
    SliderPoint,
    /// Slider repeat arrow hit.
    SliderRepeat,
    /// Slider tail tracked.
    SliderEnd,
    /// A full spinner rotation below the requirement.
    SpinnerSpin,
    /// A full spinner rotation once the requirement is met.
    SpinnerBonus,
}

impl HitResult {
    /// Miss, 50, 100 or 300: the per-object tier.
    pub fn is_base(self) -> bool {
        matches!(
            self,
            HitResult::Miss | HitResult::Hit50 | HitResult::Hit100 | HitResult::Hit300
        )
    }

    /// 50, 100 or 300.
    pub fn is_base_hit(self) -> bool {
        matches!(self, HitResult::Hit50 | HitResult::Hit100 | HitResult::Hit300)
    }

    pub fn is_slider_part(self) -> bool {
        matches!(
            self,
            HitResult::SliderStart
                | HitResult::SliderPoint
                | HitResult::SliderRepeat
                | HitResult::SliderEnd
        )
    }

    /// Results that never reach the processors.
    pub fn is_feedback_only(self) -> bool {
        matches!(self, HitResult::Ignore | HitResult::PositionalMiss)
    }

    /// Raw point value of the result.
    pub fn score_value(self) -> i64 {
        match self {
            HitResult::Hit300 => 300,
            HitResult::Hit100 => 100,
            HitResult::Hit50 => 50,
            HitResult::SliderStart | HitResult::SliderRepeat | HitResult::SliderEnd => 30,
            HitResult::SliderPoint => 10,
            HitResult::SpinnerSpin => 100,
            HitResult::SpinnerBonus => 1000,
            HitResult::Ignore
            | HitResult::PositionalMiss
            | HitResult::SliderMiss
            | HitResult::Miss => 0,
        }
    }
}

impl fmt::Display for HitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HitResult::Ignore => "ignore",
            HitResult::PositionalMiss => "positional miss",
            HitResult::SliderMiss => "slider miss",
            HitResult::Miss => "miss",
            HitResult::Hit50 => "50",
            HitResult::Hit100 => "100",
            HitResult::Hit300 => "300",
            HitResult::SliderStart => "slider start",
            HitResult::SliderPoint => "slider tick",
            HitResult::SliderRepeat => "slider repeat",
            HitResult::SliderEnd => "slider end",
            HitResult::SpinnerSpin => "spin",
            HitResult::SpinnerBonus => "spin bonus",
        };
        f.pad(name)
    }
}

/// How a judgement affects the running combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboResult {
    Reset,
    Hold,
    Increase,
}

/// Decision for a press offered to a hit object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Not for this object; let the next one have it.
    Ignored,
    /// Rejected (notelock). Feedback only, nothing is recorded.
    Shake,
    /// Attributed to this object.
    Click,
}

/// Combo-end classification layered on top of a base result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboBonus {
    /// Whole combo hit at the top tier.
    Geki,
    /// Whole combo hit, some 100s.
    Katu,
    /// Combo contained a 50 or a miss.
    Mu,
}

/// Letter grade of a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    None,
    D,
    C,
    B,
    A,
    S,
    SH,
    SS,
    SSH,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Grade::None => "None",
            Grade::D => "D",
            Grade::C => "C",
            Grade::B => "B",
            Grade::A => "A",
            Grade::S => "S",
            Grade::SH => "SH",
            Grade::SS => "SS",
            Grade::SSH => "SSH",
        };
        f.pad(name)
    }
}

/// Accumulated hit statistics for one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitStats {
    pub count_300: u32,
    pub count_geki: u32,
    pub count_100: u32,
    pub count_katu: u32,
    pub count_50: u32,
    pub count_miss: u32,
    /// Combo resets on anything other than a miss (slider breaks).
    pub combo_breaks: u32,
}

impl HitStats {
    /// Creates empty hit statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of base judgements (300/100/50/miss) recorded.
    pub fn judged(&self) -> u32 {
        self.count_300 + self.count_100 + self.count_50 + self.count_miss
    }

    /// Counts a base result. Anything else is ignored.
    pub fn record(&mut self, result: HitResult) {
        match result {
            HitResult::Hit300 => self.count_300 += 1,
            HitResult::Hit100 => self.count_100 += 1,
            HitResult::Hit50 => self.count_50 += 1,
            HitResult::Miss => self.count_miss += 1,
            _ => {}
        }
    }

    /// Calculates accuracy percentage (0-100).
    ///
    /// Weighted by score value (300 = 1, 100 = 1/3, 50 = 1/6, miss = 0) and
    /// recomputed from the tallies on every call. An empty play is 100%.
    pub fn accuracy(&self) -> f64 {
        let total = self.judged();

        if total == 0 {
            return 100.0;
        }

        let weighted = u64::from(self.count_300) * 300
            + u64::from(self.count_100) * 100
            + u64::from(self.count_50) * 50;

        (100.0 * weighted as f64 / (f64::from(total) * 300.0)).clamp(0.0, 100.0)
    }

    /// Grade for the current tallies. `silver` selects the Hidden/Flashlight
    /// variants of the top grades.
    ///
    /// Not monotonic: a 300 after a miss can move the grade back up.
    pub fn grade(&self, ladder: &GradeLadder, silver: bool) -> Grade {
        let total = self.judged();

        if self.count_300 == total {
            return if silver { Grade::SSH } else { Grade::SS };
        }

        let total = f64::from(total);
        let ratio = f64::from(self.count_300) / total;
        let ratio_50 = f64::from(self.count_50) / total;
        let no_miss = self.count_miss == 0;

        if ratio > ladder.s_ratio && ratio_50 < ladder.s_max_50_ratio && no_miss {
            if silver { Grade::SH } else { Grade::S }
        } else if (ratio > ladder.a_ratio_no_miss && no_miss) || ratio > ladder.a_ratio {
            Grade::A
        } else if (ratio > ladder.b_ratio_no_miss && no_miss) || ratio > ladder.b_ratio {
            Grade::B
        } else if ratio > ladder.c_ratio {
            Grade::C
        } else {
            Grade::D
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_accuracy_is_full() {
        assert_eq!(HitStats::new().accuracy(), 100.0);
    }

    #[test]
    fn test_accuracy_weights() {
        let stats = HitStats {
            count_300: 1,
            count_100: 1,
            count_50: 1,
            count_miss: 1,
            ..HitStats::default()
        };
        let expected = 100.0 * 450.0 / 1200.0;
        assert!((stats.accuracy() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_record_ignores_non_base_results() {
        let mut stats = HitStats::new();
        stats.record(HitResult::SliderPoint);
        stats.record(HitResult::SpinnerBonus);
        stats.record(HitResult::Hit100);
        assert_eq!(stats.judged(), 1);
        assert_eq!(stats.count_100, 1);
    }

    fn stats(c300: u32, c100: u32, c50: u32, miss: u32) -> HitStats {
        HitStats {
            count_300: c300,
            count_100: c100,
            count_50: c50,
            count_miss: miss,
            ..HitStats::default()
        }
    }

    #[test]
    fn test_grade_ladder() {
        let ladder = GradeLadder::default();
        assert_eq!(stats(10, 0, 0, 0).grade(&ladder, false), Grade::SS);
        assert_eq!(stats(10, 0, 0, 0).grade(&ladder, true), Grade::SSH);
        assert_eq!(stats(95, 5, 0, 0).grade(&ladder, false), Grade::S);
        assert_eq!(stats(95, 5, 0, 0).grade(&ladder, true), Grade::SH);
        // One miss drops an S to A.
        assert_eq!(stats(95, 4, 0, 1).grade(&ladder, false), Grade::A);
        // A 50 share of 1% blocks S.
        assert_eq!(stats(95, 4, 1, 0).grade(&ladder, false), Grade::A);
        assert_eq!(stats(85, 15, 0, 0).grade(&ladder, false), Grade::A);
        assert_eq!(stats(85, 14, 0, 1).grade(&ladder, false), Grade::B);
        assert_eq!(stats(75, 24, 0, 1).grade(&ladder, false), Grade::C);
        assert_eq!(stats(60, 40, 0, 0).grade(&ladder, false), Grade::D);
    }

    #[test]
    fn test_grade_can_recover() {
        let ladder = GradeLadder::default();
        let mut stats = stats(9, 0, 0, 1);
        assert_eq!(stats.grade(&ladder, false), Grade::B);
        stats.count_300 += 10;
        assert_eq!(stats.grade(&ladder, false), Grade::A);
    }

    proptest! {
        #[test]
        fn prop_accuracy_in_bounds(c300 in 0u32..500, c100 in 0u32..500, c50 in 0u32..500, miss in 0u32..500) {
            let acc = stats(c300, c100, c50, miss).accuracy();
            prop_assert!((0.0..=100.0).contains(&acc));
        }

        #[test]
        fn prop_grade_thresholds(c300 in 0u32..200, c100 in 0u32..200, c50 in 0u32..200, miss in 0u32..200) {
            let ladder = GradeLadder::default();
            let stats = stats(c300, c100, c50, miss);
            let grade = stats.grade(&ladder, false);
            let total = stats.judged();
            let ratio = if total == 0 { 1.0 } else { f64::from(c300) / f64::from(total) };

            if grade == Grade::SS {
                prop_assert_eq!(c300, total);
            }
            if grade == Grade::S {
                prop_assert!(ratio > ladder.s_ratio);
                prop_assert_eq!(miss, 0);
            }
            if grade >= Grade::A {
                prop_assert!(ratio > ladder.a_ratio_no_miss);
            }
            if grade >= Grade::C {
                prop_assert!(ratio > ladder.c_ratio);
            }
            if ratio <= ladder.c_ratio {
                prop_assert_eq!(grade, Grade::D);
            }
            prop_assert_eq!(stats.grade(&ladder, true) >= Grade::SH, grade >= Grade::S);
        }
    }

    #[test]
    fn test_grade_ordering() {
        assert!(Grade::SSH > Grade::SS);
        assert!(Grade::S > Grade::A);
        assert!(Grade::D > Grade::None);
    }
}
