//! Hit-object judges.
//!
//! One `Judge` exists per hit object and holds a state machine for every
//! player sharing the beatmap. Judges never look at the coordinator: anything
//! they need about other objects arrives as a precomputed `ClickAction`, and
//! every judgement they issue is pushed onto an event buffer that the
//! coordinator drains after the call.

mod circle;
mod slider;
mod spinner;

pub use circle::CircleJudge;
pub use slider::{SliderEvent, SliderEventKind, SliderJudge, ball_position, slider_events};
pub use spinner::SpinnerJudge;

use crate::models::engine::{CursorSample, DifficultyContext, HitObjectKind, HitObjectSpec, Vec2};
use crate::models::stats::{ClickAction, ComboResult, HitResult};

/// A judgement issued by a judge for one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeEvent {
    pub player: usize,
    pub time: f64,
    /// Where the judgement happened on the player's playfield.
    pub position: Vec2,
    pub result: HitResult,
    pub combo: ComboResult,
}

impl JudgeEvent {
    pub fn new(player: usize, time: f64, position: Vec2, result: HitResult, combo: ComboResult) -> Self {
        Self {
            player,
            time,
            position,
            result,
            combo,
        }
    }
}

/// Judge of one hit object, dispatched over its kind.
#[derive(Debug, Clone)]
pub enum Judge {
    Circle(CircleJudge),
    Slider(SliderJudge),
    Spinner(SpinnerJudge),
}

impl Judge {
    /// Builds the judge for `spec`, tracking `players` independent states.
    ///
    /// `fade_time` is the activation time computed by the coordinator.
    pub fn new(id: usize, spec: &HitObjectSpec, fade_time: f64, players: usize) -> Self {
        match &spec.kind {
            HitObjectKind::Circle => Judge::Circle(CircleJudge::new(id, spec, fade_time, players)),
            HitObjectKind::Slider { .. } => {
                Judge::Slider(SliderJudge::new(id, spec, fade_time, players))
            }
            HitObjectKind::Spinner => {
                Judge::Spinner(SpinnerJudge::new(id, spec, fade_time, players))
            }
        }
    }

    /// Sequence id of the object.
    pub fn id(&self) -> usize {
        match self {
            Judge::Circle(j) => j.id,
            Judge::Slider(j) => j.id,
            Judge::Spinner(j) => j.id,
        }
    }

    /// Time at which the object moves from the queue to the processed list.
    pub fn fade_time(&self) -> f64 {
        match self {
            Judge::Circle(j) => j.fade_time,
            Judge::Slider(j) => j.fade_time,
            Judge::Spinner(j) => j.fade_time,
        }
    }

    /// Alias of `fade_time`, used for activation ordering.
    pub fn activation_time(&self) -> f64 {
        self.fade_time()
    }

    /// Advances time-based state (slider ball, spinner rotation) from a
    /// cursor sample. Returns true once the object is resolved for `player`.
    pub fn on_cursor_move(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        process_ahead: bool,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        match self {
            Judge::Circle(j) => j.is_resolved(player),
            Judge::Slider(j) => j.on_cursor_move(player, ctx, sample, process_ahead, out),
            Judge::Spinner(j) => j.on_cursor_move(player, ctx, sample, out),
        }
    }

    /// Offers a fresh press to the object. Returns true if the press was
    /// consumed and must not reach later objects.
    pub fn on_cursor_click(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        sample: &CursorSample,
        action: ClickAction,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        match self {
            Judge::Circle(j) => j.on_cursor_click(player, ctx, sample, action, out),
            Judge::Slider(j) => j.on_cursor_click(player, ctx, sample, action, out),
            Judge::Spinner(_) => false,
        }
    }

    /// Issues time-out judgements. Returns true once resolved for `player`.
    pub fn on_late_update(
        &mut self,
        player: usize,
        ctx: &DifficultyContext,
        time: f64,
        out: &mut Vec<JudgeEvent>,
    ) -> bool {
        match self {
            Judge::Circle(j) => j.on_late_update(player, ctx, time, out),
            Judge::Slider(j) => j.on_late_update(player, ctx, time, out),
            Judge::Spinner(j) => j.on_late_update(player, ctx, time, out),
        }
    }

    pub fn is_resolved(&self, player: usize) -> bool {
        match self {
            Judge::Circle(j) => j.is_resolved(player),
            Judge::Slider(j) => j.is_resolved(player),
            Judge::Spinner(j) => j.is_resolved(player),
        }
    }

    /// Resolved for every tracked player.
    pub fn is_resolved_for_all(&self) -> bool {
        (0..self.player_count()).all(|p| self.is_resolved(p))
    }

    /// Whether the object has taken its click (circles and slider heads).
    /// Spinners never block other objects and always count as hit.
    pub fn is_hit(&self, player: usize) -> bool {
        match self {
            Judge::Circle(j) => j.is_resolved(player),
            Judge::Slider(j) => j.is_head_judged(player),
            Judge::Spinner(_) => true,
        }
    }

    fn player_count(&self) -> usize {
        match self {
            Judge::Circle(j) => j.states.len(),
            Judge::Slider(j) => j.states.len(),
            Judge::Spinner(j) => j.states.len(),
        }
    }
}

/// Outcome of a press offered to a circle or slider head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeadPress {
    /// Not for this object.
    Passed,
    /// Consumed without a judgement (notelock).
    Shaken,
    Judged(HitResult),
}

/// Head judgement shared by circles and slider heads.
pub(crate) fn judge_head_press(
    player: usize,
    ctx: &DifficultyContext,
    start_time: f64,
    head: Vec2,
    sample: &CursorSample,
    action: ClickAction,
    out: &mut Vec<JudgeEvent>,
) -> HeadPress {
    let offset = sample.time - start_time;
    let inside = sample.position.distance(head) <= ctx.circle_radius;

    if !inside {
        if offset.abs() < ctx.hit_window.hit_50_ms {
            out.push(JudgeEvent::new(
                player,
                sample.time,
                sample.position,
                HitResult::PositionalMiss,
                ComboResult::Hold,
            ));
        }
        return HeadPress::Passed;
    }

    match action {
        ClickAction::Ignored => HeadPress::Passed,
        ClickAction::Shake => {
            out.push(JudgeEvent::new(
                player,
                sample.time,
                sample.position,
                HitResult::PositionalMiss,
                ComboResult::Hold,
            ));
            HeadPress::Shaken
        }
        ClickAction::Click => HeadPress::Judged(ctx.hit_window.judge(offset)),
    }
}
