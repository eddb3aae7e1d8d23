//! Slider judge: head click, ticks, repeats and tail.

use super::{HeadPress, JudgeEvent, judge_head_press};
use crate::models::engine::beatmap::polyline_length;
use crate::models::engine::{CursorSample, DifficultyContext, HitObjectKind, HitObjectSpec, Vec2};
use crate::models::stats::{ClickAction, ComboResult, HitResult};

/// Ticks closer than this (ms) to a span end are dropped.
const TICK_END_GAP_MS: f64 = 10.0;
/// Tick spacing below this (ms) is treated as "no ticks".
const MIN_TICK_INTERVAL_MS: f64 = 1.0;
/// How early the tail is checked when the caller processes slider ends ahead.
const TAIL_LENIENCE_MS: f64 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderEventKind {
    Tick,
    Repeat,
    Tail,
}

/// A timed checkpoint along the slider body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderEvent {
    pub time: f64,
    pub kind: SliderEventKind,
}

/// Checkpoints of a slider in time order. The tail is always last.
pub fn slider_events(spec: &HitObjectSpec) -> Vec<SliderEvent> {
    let start = spec.start_time;
    let end = spec.resolved_end_time();

    let (spans, tick_interval) = match &spec.kind {
        HitObjectKind::Slider {
            span_count,
            tick_interval,
            ..
        } => ((*span_count).max(1), *tick_interval),
        _ => (1, 0.0),
    };

    let span_duration = (end - start) / f64::from(spans);
    let mut events = Vec::new();

    for span in 0..spans {
        let span_start = start + f64::from(span) * span_duration;

        if tick_interval >= MIN_TICK_INTERVAL_MS && span_duration > 0.0 {
            let mut offsets = Vec::new();
            let mut offset = tick_interval;
            while offset < span_duration - TICK_END_GAP_MS {
                offsets.push(offset);
                offset += tick_interval;
            }

            if span % 2 == 1 {
                // Reversed span: ticks sit at the same path positions, walked backwards.
                for offset in offsets.iter().rev() {
                    events.push(SliderEvent {
                        time: span_start + span_duration - offset,
                        kind: SliderEventKind::Tick,
                    });
                }
            } else {
                for offset in offsets {
                    events.push(SliderEvent {
                        time: span_start + offset,
                        kind: SliderEventKind::Tick,
                    });
                }
            }
        }

        if span + 1 < spans {
            events.push(SliderEvent {
                time: span_start + span_duration,
                kind: SliderEventKind::Repeat,
            });
        }
    }

    events.push(SliderEvent {
        time: end,
        kind: SliderEventKind::Tail,
    });

    events
}

/// Untransformed ball position at `time`.
pub fn ball_position(spec: &HitObjectSpec, time: f64) -> Vec2 {
    let HitObjectKind::Slider {
        path, span_count, ..
    } = &spec.kind
    else {
        return spec.position;
    };

    let length = polyline_length(path);
    let duration = spec.resolved_end_time() - spec.start_time;
    if path.len() < 2 || length <= 0.0 || duration <= 0.0 {
        return spec.position;
    }

    let spans = f64::from((*span_count).max(1));
    let progress = ((time - spec.start_time) / duration * spans).clamp(0.0, spans);
    let span = progress.floor().min(spans - 1.0);
    let mut fraction = progress - span;
    if span as u32 % 2 == 1 {
        fraction = 1.0 - fraction;
    }

    point_at(path, fraction * length)
}

fn point_at(path: &[Vec2], distance: f64) -> Vec2 {
    let mut walked = 0.0;
    for pair in path.windows(2) {
        let segment = pair[0].distance(pair[1]);
        if segment > 0.0 && walked + segment >= distance {
            return pair[0].lerp(pair[1], (distance - walked) / segment);
        }
        walked += segment;
    }
    path.last().copied().unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SliderState {
    /// `None` while the head is still waiting for a press.
    head: Option<bool>,
    next_event: usize,
    parts_hit: u32,
    tracking: bool,
    process_ahead: bool,
    finished: bool,
}

#[derive(Debug, Clone)]
pub struct SliderJudge {
    pub id: usize,
    pub fade_time: f64,
    spec: HitObjectSpec,
    events: Vec<SliderEvent>,
    pub(crate) states: Vec<SliderState>,
}

impl SliderJudge {
    pub fn new(id: usize, spec: &HitObjectSpec, fade_time: f64, players: usize) -> Self {
        Self {
            id,
            fade_time,
            spec: spec.clone(),
            events: slider_events(spec),
            states: vec![SliderState::default(); players],
        }
    }

    pub fn is_resolved(&self, player: usize) -> bool {
        self.states.get(player).is_none_or(|s| s.finished)
    }

    pub fn is_head_judged(&self, player: usize) -> bool {
        self.states.get(player).is_none_or(|s| s.head.is_some())
    }

    /// Head plus every checkpoint.
    fn part_count(&self) -> u32 {
        u32::try_from(self.events.len()).unwrap_or(u32::MAX).saturating_add(1)
    }

    fn ball(&self, ctx: &DifficultyContext, time: f64) -> Vec2 {
        self.spec
            .transform(ball_position(&self.spec, time), ctx.mods, ctx.object_scale())
    }

    pub fn on_cursor_click(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        action: ClickAction,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let head = self.spec.stacked_position(ctx.mods, ctx.object_scale());
        let Some(state) = self.states.get_mut(player) else {
            return false;
        };
        if state.head.is_some() {
            return false;
        }

        match judge_head_press(player, ctx, self.spec.start_time, head, sample, action, out) {
            HeadPress::Passed => false,
            HeadPress::Shaken => true,
            HeadPress::Judged(result) => {
                let hit = result.is_base_hit();
                state.head = Some(hit);
                if hit {
                    state.parts_hit += 1;
                    state.tracking = true;
                    out.push(JudgeEvent::new(
                        player,
                        sample.time,
                        head,
                        HitResult::SliderStart,
                        ComboResult::Increase,
                    ));
                } else {
                    out.push(JudgeEvent::new(
                        player,
                        sample.time,
                        head,
                        HitResult::SliderMiss,
                        ComboResult::Reset,
                    ));
                }
                true
            }
        }
    }

    pub fn on_cursor_move(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        process_ahead: bool,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let ball = self.ball(ctx, sample.time);
        let in_body = sample.time >= self.spec.start_time && sample.time <= self.spec.resolved_end_time();

        let Some(state) = self.states.get_mut(player) else {
            return true;
        };
        state.process_ahead = process_ahead;

        if in_body {
            let radius = if state.tracking {
                ctx.follow_radius
            } else {
                ctx.circle_radius
            };
            state.tracking = sample.any_down() && sample.position.distance(ball) <= radius;
        }

        self.advance(player, ctx, sample.time, out)
    }

    pub fn on_late_update(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        time: f64,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        self.advance(player, ctx, time, out)
    }

    fn advance(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        time: f64,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        let part_count = self.part_count();
        let head = self.spec.stacked_position(ctx.mods, ctx.object_scale());
        let start_time = self.spec.start_time;

        let Some(state) = self.states.get(player) else {
            return true;
        };
        if state.finished {
            return true;
        }

        let mut state = state.clone();

        if state.head.is_none() && ctx.hit_window.is_expired(start_time, time) {
            state.head = Some(false);
            out.push(JudgeEvent::new(
                player,
                time,
                head,
                HitResult::SliderMiss,
                ComboResult::Reset,
            ));
        }

        while let Some(event) = self.events.get(state.next_event) {
            let due = match event.kind {
                SliderEventKind::Tail if state.process_ahead => {
                    (event.time - TAIL_LENIENCE_MS).max(start_time)
                }
                _ => event.time,
            };
            if time < due {
                break;
            }

            let position = self.ball(ctx, event.time);
            let (result, combo) = match (event.kind, state.tracking) {
                (SliderEventKind::Tick, true) => (HitResult::SliderPoint, ComboResult::Increase),
                (SliderEventKind::Repeat, true) => (HitResult::SliderRepeat, ComboResult::Increase),
                (SliderEventKind::Tail, true) => (HitResult::SliderEnd, ComboResult::Increase),
                (SliderEventKind::Tail, false) => (HitResult::SliderMiss, ComboResult::Hold),
                (_, false) => (HitResult::SliderMiss, ComboResult::Reset),
            };
            if state.tracking {
                state.parts_hit += 1;
            }
            out.push(JudgeEvent::new(player, time, position, result, combo));
            state.next_event += 1;
        }

        if state.head.is_some() && state.next_event >= self.events.len() {
            state.finished = true;

            let result = if state.parts_hit >= part_count {
                HitResult::Hit300
            } else if state.parts_hit * 2 >= part_count {
                HitResult::Hit100
            } else if state.parts_hit > 0 {
                HitResult::Hit50
            } else {
                HitResult::Miss
            };
            let combo = if result == HitResult::Miss {
                ComboResult::Reset
            } else {
                ComboResult::Hold
            };
            let tail = self.ball(ctx, self.spec.resolved_end_time());
            out.push(JudgeEvent::new(player, time, tail, result, combo));
        }

        let finished = state.finished;
        self.states[player] = state;
        finished
    }
}
