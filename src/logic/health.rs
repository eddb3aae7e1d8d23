//! Player health: passive drain, judgement gains, recovery credits and fail.

use crate::logic::judge::{SliderEventKind, slider_events};
use crate::models::engine::{DifficultyContext, HitObjectKind, HitObjectSpec, difficulty_range};
use crate::models::mods::Mods;
use crate::models::settings::HealthConfig;
use crate::models::stats::{ComboBonus, HitResult};

/// Health values below are expressed on this scale and rescaled to `max_hp`.
const REFERENCE_MAX_HP: f64 = 200.0;

const HP_HIT_300: f64 = 6.0;
const HP_HIT_100: f64 = 2.2;
const HP_HIT_50: f64 = 0.4;
const HP_SLIDER_TICK: f64 = 3.0;
const HP_SLIDER_PART: f64 = 4.0;
const HP_SPINNER_SPIN: f64 = 1.7;
const HP_SPINNER_BONUS: f64 = 2.0;
const HP_GEKI: f64 = 14.0;
const HP_KATU: f64 = 10.0;
const HP_MU: f64 = 6.0;

const DRAIN_SEARCH_STEPS: usize = 40;

/// State change produced by a health mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    None,
    /// A recovery credit was spent instead of failing.
    Recovered,
    /// The player just failed. Returned once per session.
    Failed,
}

#[derive(Debug, Clone)]
pub struct HealthProcessor {
    max_hp: f64,
    hp: f64,
    scale: f64,
    /// HP lost per millisecond of map time.
    drain_rate: f64,
    miss_penalty: f64,
    slider_miss_penalty: f64,
    recovery_hp: f64,
    recoveries: u32,
    prevents_fail: bool,
    failed: bool,
    drain_start: f64,
    drain_end: f64,
    last_time: Option<f64>,
}

impl HealthProcessor {
    pub fn new(objects: &[HitObjectSpec], ctx: &DifficultyContext, config: &HealthConfig) -> Self {
        let max_hp = config.max_hp.max(1.0);
        let scale = max_hp / REFERENCE_MAX_HP;

        let drain_start = objects.first().map_or(0.0, |o| o.start_time);
        let drain_end = objects
            .iter()
            .map(HitObjectSpec::resolved_end_time)
            .fold(drain_start, f64::max);

        let recoveries = if ctx.check_mod_active(Mods::EASY) {
            config.easy_recoveries
        } else {
            0
        };

        let mut health = Self {
            max_hp,
            hp: max_hp,
            scale,
            drain_rate: 0.0,
            miss_penalty: difficulty_range(ctx.hp, -6.0, -25.0, -40.0) * scale,
            slider_miss_penalty: difficulty_range(ctx.hp, -2.0, -5.0, -8.0) * scale,
            recovery_hp: config.recovery_hp.clamp(0.0, max_hp),
            recoveries,
            prevents_fail: ctx.prevents_fail(),
            failed: false,
            drain_start,
            drain_end,
            last_time: None,
        };

        let lowest = difficulty_range(ctx.hp, 195.0, 160.0, 60.0) * scale;
        health.drain_rate = health.compute_drain_rate(objects, lowest);

        log::debug!(
            "HEALTH: drain {:.5} hp/ms, lowest target {:.1}, {} recoveries",
            health.drain_rate,
            lowest,
            health.recoveries
        );

        health
    }

    /// Largest drain rate at which a perfect play never dips below `lowest`.
    fn compute_drain_rate(&self, objects: &[HitObjectSpec], lowest: f64) -> f64 {
        let gains = self.perfect_play_gains(objects);
        if gains.is_empty() {
            return 0.0;
        }

        let survives = |rate: f64| {
            let mut hp = self.max_hp;
            let mut last = self.drain_start;
            for &(time, gain) in &gains {
                hp -= rate * (time - last).max(0.0);
                if hp < lowest {
                    return false;
                }
                hp = (hp + gain).min(self.max_hp);
                last = time;
            }
            true
        };

        let mut low = 0.0;
        let mut high = self.max_hp / 1000.0;
        if survives(high) {
            return high;
        }

        for _ in 0..DRAIN_SEARCH_STEPS {
            let mid = (low + high) / 2.0;
            if survives(mid) {
                low = mid;
            } else {
                high = mid;
            }
        }

        low
    }

    /// HP gains of an all-300 play, in time order.
    fn perfect_play_gains(&self, objects: &[HitObjectSpec]) -> Vec<(f64, f64)> {
        let mut gains = Vec::new();

        for (index, object) in objects.iter().enumerate() {
            let combo_end = objects.get(index + 1).is_none_or(|next| next.new_combo);
            let end_gain = self.gain(HitResult::Hit300)
                + if combo_end {
                    self.bonus_gain(ComboBonus::Geki)
                } else {
                    0.0
                };

            match object.kind {
                HitObjectKind::Circle => gains.push((object.start_time, end_gain)),
                HitObjectKind::Slider { .. } => {
                    gains.push((object.start_time, self.gain(HitResult::SliderStart)));
                    for event in slider_events(object) {
                        let result = match event.kind {
                            SliderEventKind::Tick => HitResult::SliderPoint,
                            SliderEventKind::Repeat => HitResult::SliderRepeat,
                            SliderEventKind::Tail => HitResult::SliderEnd,
                        };
                        gains.push((event.time, self.gain(result)));
                    }
                    gains.push((object.resolved_end_time(), end_gain));
                }
                HitObjectKind::Spinner => gains.push((object.resolved_end_time(), end_gain)),
            }
        }

        gains.sort_by(|a, b| a.0.total_cmp(&b.0));
        gains
    }

    fn gain(&self, result: HitResult) -> f64 {
        match result {
            HitResult::Hit300 => HP_HIT_300 * self.scale,
            HitResult::Hit100 => HP_HIT_100 * self.scale,
            HitResult::Hit50 => HP_HIT_50 * self.scale,
            HitResult::SliderPoint => HP_SLIDER_TICK * self.scale,
            HitResult::SliderStart | HitResult::SliderRepeat | HitResult::SliderEnd => {
                HP_SLIDER_PART * self.scale
            }
            HitResult::SpinnerSpin => HP_SPINNER_SPIN * self.scale,
            HitResult::SpinnerBonus => HP_SPINNER_BONUS * self.scale,
            HitResult::Miss => self.miss_penalty,
            HitResult::SliderMiss => self.slider_miss_penalty,
            HitResult::Ignore | HitResult::PositionalMiss => 0.0,
        }
    }

    fn bonus_gain(&self, bonus: ComboBonus) -> f64 {
        let base = match bonus {
            ComboBonus::Geki => HP_GEKI,
            ComboBonus::Katu => HP_KATU,
            ComboBonus::Mu => HP_MU,
        };
        base * self.scale
    }

    pub fn hp(&self) -> f64 {
        self.hp
    }

    /// HP normalized to 0..=1.
    pub fn fraction(&self) -> f64 {
        self.hp / self.max_hp
    }

    pub fn drain_rate(&self) -> f64 {
        self.drain_rate
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn increase(&mut self, amount: f64) {
        self.hp = (self.hp + amount).clamp(0.0, self.max_hp);
    }

    /// Applies passive drain up to `time`.
    pub fn update(&mut self, time: f64) -> HealthTransition {
        let Some(last) = self.last_time else {
            self.last_time = Some(time);
            return HealthTransition::None;
        };
        if time <= last {
            return HealthTransition::None;
        }
        self.last_time = Some(time);

        if self.failed {
            return HealthTransition::None;
        }

        let from = last.max(self.drain_start);
        let to = time.min(self.drain_end);
        if to > from {
            self.increase(-self.drain_rate * (to - from));
        }

        self.check_fail(false, false)
    }

    /// Applies the HP delta of a judgement and its combo-end bonus.
    pub fn apply_judgement(&mut self, result: HitResult, bonus: Option<ComboBonus>) -> HealthTransition {
        let mut amount = self.gain(result);
        if let Some(bonus) = bonus {
            amount += self.bonus_gain(bonus);
        }
        self.increase(amount);
        self.check_fail(false, false)
    }

    /// Removes `amount` HP. With `bypass_recovery`, reaching zero fails even
    /// if recovery credits remain.
    pub fn force_drain(&mut self, amount: f64, bypass_recovery: bool) -> HealthTransition {
        self.increase(-amount.abs());
        self.check_fail(false, bypass_recovery)
    }

    /// Fails the player regardless of modifiers and credits.
    pub fn force_fail(&mut self) -> HealthTransition {
        self.hp = 0.0;
        self.check_fail(true, true)
    }

    fn check_fail(&mut self, forced: bool, bypass_recovery: bool) -> HealthTransition {
        if self.hp > 0.0 || self.failed {
            return HealthTransition::None;
        }

        if !forced && self.prevents_fail {
            return HealthTransition::None;
        }

        if !bypass_recovery && !forced && self.recoveries > 0 {
            self.recoveries -= 1;
            self.increase(self.recovery_hp);
            log::info!("HEALTH: Recovery used, {} left", self.recoveries);
            return HealthTransition::Recovered;
        }

        self.failed = true;
        HealthTransition::Failed
    }
}
