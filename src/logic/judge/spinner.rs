use super::JudgeEvent;
use crate::models::engine::{CursorSample, DifficultyContext, HitObjectSpec};
use crate::models::mods::Mods;
use crate::models::stats::{ComboResult, HitResult};
use std::f64::consts::{PI, TAU};

/// Fastest rotation credited (rad per real ms), about 477 RPM.
const MAX_ANGULAR_VELOCITY: f64 = 0.05;
/// Rotation speed applied automatically under Spun Out (rad per real ms).
const SPUN_OUT_VELOCITY: f64 = 0.03;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpinnerState {
    last_time: Option<f64>,
    last_angle: f64,
    /// Total credited rotation in radians.
    rotation: f64,
    full_spins: u32,
    finished: bool,
}

/// Rotation accumulator with a step-function verdict at the end time.
#[derive(Debug, Clone)]
pub struct SpinnerJudge {
    pub id: usize,
    pub fade_time: f64,
    spec: HitObjectSpec,
    pub(crate) states: Vec<SpinnerState>,
}

impl SpinnerJudge {
    pub fn new(id: usize, spec: &HitObjectSpec, fade_time: f64, players: usize) -> Self {
        Self {
            id,
            fade_time,
            spec: spec.clone(),
            states: vec![SpinnerState::default(); players],
        }
    }

    pub fn is_resolved(&self, player: usize) -> bool {
        self.states.get(player).is_none_or(|s| s.finished)
    }

    /// Full rotations needed for a 300.
    pub fn required_spins(&self, ctx: &DifficultyContext) -> f64 {
        let duration = self.spec.resolved_end_time() - self.spec.start_time;
        (duration / 1000.0 * ctx.spinner_rps).max(0.0)
    }

    /// Rotations completed so far by `player`.
    pub fn rotations(&self, player: usize) -> f64 {
        self.states.get(player).map_or(0.0, |s| s.rotation / TAU)
    }

    pub fn on_cursor_move(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let required = self.required_spins(ctx);
        let start = self.spec.start_time;
        let end = self.spec.resolved_end_time();
        let center = self.spec.stacked_position(ctx.mods, ctx.object_scale());

        let Some(state) = self.states.get_mut(player) else {
            return true;
        };
        if state.finished || sample.time < start {
            return state.finished;
        }

        let time = sample.time.min(end);
        let angle = sample.position.angle_around(center);

        if let Some(last_time) = state.last_time {
            // Sample times are map time; the caps apply to real time.
            let dt = (time - last_time).max(0.0) / ctx.speed;
            let credited = if ctx.check_mod_active(Mods::SPUN_OUT) {
                SPUN_OUT_VELOCITY * dt
            } else if sample.any_down() {
                let mut delta = angle - state.last_angle;
                if delta > PI {
                    delta -= TAU;
                } else if delta < -PI {
                    delta += TAU;
                }
                delta.abs().min(MAX_ANGULAR_VELOCITY * dt)
            } else {
                0.0
            };
            state.rotation += credited;
        }

        state.last_time = Some(time);
        state.last_angle = angle;

        while f64::from(state.full_spins + 1) * TAU <= state.rotation {
            state.full_spins += 1;
            let result = if f64::from(state.full_spins) > required {
                HitResult::SpinnerBonus
            } else {
                HitResult::SpinnerSpin
            };
            out.push(JudgeEvent::new(player, time, center, result, ComboResult::Hold));
        }

        state.finished
    }

    pub fn on_late_update(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        time: f64,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let required = self.required_spins(ctx);
        let end = self.spec.resolved_end_time();
        let center = self.spec.stacked_position(ctx.mods, ctx.object_scale());

        let Some(state) = self.states.get_mut(player) else {
            return true;
        };
        if state.finished || time < end {
            return state.finished;
        }

        state.finished = true;

        let spins = state.rotation / TAU;
        let result = if required <= 0.0 || spins >= required {
            HitResult::Hit300
        } else if spins >= required / 2.0 {
            HitResult::Hit100
        } else if spins >= required / 4.0 && state.full_spins >= 1 {
            HitResult::Hit50
        } else {
            HitResult::Miss
        };
        let combo = if result == HitResult::Miss {
            ComboResult::Reset
        } else {
            ComboResult::Increase
        };
        out.push(JudgeEvent::new(player, time, center, result, combo));

        true
    }
}
