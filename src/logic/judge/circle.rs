use super::{HeadPress, JudgeEvent, judge_head_press};
use crate::models::engine::{CursorSample, DifficultyContext, HitObjectSpec};
use crate::models::stats::{ClickAction, ComboResult, HitResult};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CircleState {
    judged: bool,
}

/// Single judgement window centered on the start time.
#[derive(Debug, Clone)]
pub struct CircleJudge {
    pub id: usize,
    pub fade_time: f64,
    spec: HitObjectSpec,
    pub(crate) states: Vec<CircleState>,
}

impl CircleJudge {
    pub fn new(id: usize, spec: &HitObjectSpec, fade_time: f64, players: usize) -> Self {
        Self {
            id,
            fade_time,
            spec: spec.clone(),
            states: vec![CircleState::default(); players],
        }
    }

    pub fn is_resolved(&self, player: usize) -> bool {
        self.states.get(player).is_none_or(|s| s.judged)
    }

    pub fn on_cursor_click(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        action: ClickAction,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let Some(state) = self.states.get_mut(player) else {
            return false;
        };
        if state.judged {
            return false;
        }

        let head = self.spec.stacked_position(ctx.mods, ctx.object_scale());
        match judge_head_press(player, ctx, self.spec.start_time, head, sample, action, out) {
            HeadPress::Passed => false,
            HeadPress::Shaken => true,
            HeadPress::Judged(result) => {
                state.judged = true;
                let combo = if result == HitResult::Miss {
                    ComboResult::Reset
                } else {
                    ComboResult::Increase
                };
                out.push(JudgeEvent::new(player, sample.time, head, result, combo));
                true
            }
        }
    }

    pub fn on_late_update(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        time: f64,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let Some(state) = self.states.get_mut(player) else {
            return true;
        };

        if !state.judged && ctx.hit_window.is_expired(self.spec.start_time, time) {
            state.judged = true;
            let head = self.spec.stacked_position(ctx.mods, ctx.object_scale());
            out.push(JudgeEvent::new(
                player,
                time,
                head,
                HitResult::Miss,
                ComboResult::Reset,
            ));
        }

        state.judged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::engine::{BaseDifficulty, Vec2};
    use crate::models::mods::Mods;

    fn ctx(od: f64) -> DifficultyContext {
        DifficultyContext::new(
            BaseDifficulty {
                hp: 5.0,
                cs: 4.0,
                od,
                ar: 9.0,
            },
            Mods::NONE,
        )
    }

    fn judge() -> CircleJudge {
        let spec = HitObjectSpec::circle(1000.0, Vec2::new(256.0, 192.0), true);
        CircleJudge::new(0, &spec, 400.0, 1)
    }

    fn press(time: f64, x: f64, y: f64) -> CursorSample {
        CursorSample::new(time, Vec2::new(x, y), true, false)
    }

    #[test]
    fn test_click_inside_window_is_300() {
        let ctx = ctx(0.0);
        let mut judge = judge();
        let mut out = Vec::new();

        let consumed = judge.on_cursor_click(0, &ctx, &press(1005.0, 256.0, 192.0), ClickAction::Click, &mut out);

        assert!(consumed);
        assert!(judge.is_resolved(0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].result, HitResult::Hit300);
        assert_eq!(out[0].combo, ComboResult::Increase);
    }

    #[test]
    fn test_click_outside_radius_is_positional_miss() {
        let ctx = ctx(5.0);
        let mut judge = judge();
        let mut out = Vec::new();

        let consumed = judge.on_cursor_click(0, &ctx, &press(1000.0, 400.0, 50.0), ClickAction::Click, &mut out);

        assert!(!consumed);
        assert!(!judge.is_resolved(0));
        assert_eq!(out[0].result, HitResult::PositionalMiss);
    }

    #[test]
    fn test_shake_consumes_without_judging() {
        let ctx = ctx(5.0);
        let mut judge = judge();
        let mut out = Vec::new();

        let consumed = judge.on_cursor_click(0, &ctx, &press(1000.0, 256.0, 192.0), ClickAction::Shake, &mut out);

        assert!(consumed);
        assert!(!judge.is_resolved(0));
        assert!(out.iter().all(|e| e.result.is_feedback_only()));
    }

    #[test]
    fn test_ignored_falls_through() {
        let ctx = ctx(5.0);
        let mut judge = judge();
        let mut out = Vec::new();

        assert!(!judge.on_cursor_click(0, &ctx, &press(1000.0, 256.0, 192.0), ClickAction::Ignored, &mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn test_timeout_misses_once() {
        let ctx = ctx(5.0);
        let mut judge = judge();
        let mut out = Vec::new();

        assert!(!judge.on_late_update(0, &ctx, 1150.0, &mut out));
        assert!(judge.on_late_update(0, &ctx, 1151.0, &mut out));
        assert!(judge.on_late_update(0, &ctx, 1151.0, &mut out));

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].result, HitResult::Miss);
        assert_eq!(out[0].combo, ComboResult::Reset);
    }

    #[test]
    fn test_players_are_independent() {
        let ctx = ctx(5.0);
        let spec = HitObjectSpec::circle(1000.0, Vec2::new(256.0, 192.0), true);
        let mut judge = CircleJudge::new(0, &spec, 400.0, 2);
        let mut out = Vec::new();

        judge.on_cursor_click(0, &ctx, &press(1000.0, 256.0, 192.0), ClickAction::Click, &mut out);

        assert!(judge.is_resolved(0));
        assert!(!judge.is_resolved(1));
    }
}
