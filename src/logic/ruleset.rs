//! Ruleset coordinator.
//!
//! Owns the object timeline (queue, processed, retired), routes player input
//! to the judges and aggregates every judgement into a per-player `Score`.

use crate::difficulty::{PerformanceCalculator, PerformanceResult, ScoreParams};
use crate::error::{Result, RulesetError};
use crate::logic::health::{HealthProcessor, HealthTransition};
use crate::logic::judge::{Judge, JudgeEvent};
use crate::logic::player::InputState;
use crate::logic::score::{ScoreProcessor, processor_for};
use crate::models::engine::{Beatmap, CursorSample, DifficultyContext, HitObjectSpec, Vec2};
use crate::models::mods::Mods;
use crate::models::score::Score;
use crate::models::settings::RulesetConfig;
use crate::models::stats::{ClickAction, ComboBonus, ComboResult, HitResult};
use std::collections::{HashSet, VecDeque};
use std::fmt::Write as _;

/// HP removed when Sudden Death or Perfect fails a player.
const SUDDEN_DEATH_DRAIN: f64 = 100_000.0;
/// Hittable range reduction under Autopilot (ms).
const AUTOPILOT_RANGE_REDUCTION: f64 = 200.0;

/// Index of a player in the order given to `Ruleset::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub usize);

/// A player joining a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSetup {
    pub name: String,
    pub mods: Mods,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, mods: Mods) -> Self {
        Self {
            name: name.into(),
            mods,
        }
    }
}

/// Published judgement, handed to the hit listener.
#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub player: PlayerId,
    pub time: f64,
    /// Sequence id of the object.
    pub object: usize,
    pub position: Vec2,
    pub result: HitResult,
    pub bonus: Option<ComboBonus>,
    pub combo: ComboResult,
    pub performance: PerformanceResult,
    pub score: i64,
}

pub type HitListener = Box<dyn FnMut(&HitEvent) + Send>;
/// Called with (time, object id) when an object leaves the processed list.
pub type EndListener = Box<dyn FnMut(f64, usize) + Send>;
pub type FailListener = Box<dyn FnMut(PlayerId) + Send>;

struct PlayerSession {
    ctx: DifficultyContext,
    input: InputState,
    processor: Box<dyn ScoreProcessor>,
    health: HealthProcessor,
    score: Score,
    performance: PerformanceResult,
    /// Base judgements since the last combo end.
    current_katu: u32,
    current_bad: u32,
    sudden_death_fail: bool,
}

pub struct Ruleset {
    config: RulesetConfig,
    objects: Vec<HitObjectSpec>,
    judges: Vec<Judge>,
    queue: VecDeque<usize>,
    processed: Vec<usize>,
    retired: usize,
    players: Vec<PlayerSession>,
    calculator: Box<dyn PerformanceCalculator>,
    events: Vec<JudgeEvent>,
    hit_listener: Option<HitListener>,
    end_listener: Option<EndListener>,
    fail_listener: Option<FailListener>,
    last_end_time: f64,
    ended: bool,
}

impl Ruleset {
    /// Builds a session for `players` on `beatmap`.
    ///
    /// Rejects empty beatmaps, empty or duplicate player lists, and objects
    /// with non-finite times. Objects are ordered by start time and numbered
    /// in that order.
    pub fn new(
        mut beatmap: Beatmap,
        players: Vec<PlayerSetup>,
        config: RulesetConfig,
        calculator: Box<dyn PerformanceCalculator>,
    ) -> Result<Self> {
        if beatmap.objects.is_empty() {
            return Err(RulesetError::EmptyBeatmap);
        }
        if players.is_empty() {
            return Err(RulesetError::NoPlayers);
        }

        let mut names = HashSet::new();
        for setup in &players {
            if !names.insert(setup.name.as_str()) {
                return Err(RulesetError::DuplicatePlayer(setup.name.clone()));
            }
        }

        for (index, object) in beatmap.objects.iter().enumerate() {
            if !object.start_time.is_finite() || !object.end_time.is_finite() {
                return Err(RulesetError::InvalidObject {
                    index,
                    reason: "non-finite time".to_string(),
                });
            }
            if !object.position.x.is_finite() || !object.position.y.is_finite() {
                return Err(RulesetError::InvalidObject {
                    index,
                    reason: "non-finite position".to_string(),
                });
            }
        }

        beatmap
            .objects
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let contexts: Vec<DifficultyContext> = players
            .iter()
            .map(|setup| DifficultyContext::new(beatmap.difficulty, setup.mods))
            .collect();

        let preempt = contexts
            .iter()
            .map(|ctx| ctx.preempt)
            .fold(0.0, f64::max);

        let judges: Vec<Judge> = beatmap
            .objects
            .iter()
            .enumerate()
            .map(|(id, spec)| Judge::new(id, spec, spec.start_time - preempt, players.len()))
            .collect();

        let total_objects = u32::try_from(beatmap.objects.len()).unwrap_or(u32::MAX);

        let sessions: Vec<PlayerSession> = players
            .into_iter()
            .zip(contexts)
            .map(|(setup, ctx)| {
                let health = HealthProcessor::new(&beatmap.objects, &ctx, &config.health);
                let processor = processor_for(&beatmap, &ctx);

                let full_map = ScoreParams {
                    mode: 0,
                    mods: setup.mods,
                    max_combo: 0,
                    accuracy: 100.0,
                    misses: 0,
                    passed_objects: 0,
                }
                .clamped(total_objects);
                let stars = calculator.calculate(&full_map).stars;

                log::info!(
                    "RULESET: {} [{}] {:.2}* | HP {:.1} CS {:.1} OD {:.1} AR {:.1} | drain {:.4}/ms | {} recoveries",
                    setup.name,
                    setup.mods,
                    stars,
                    ctx.hp,
                    ctx.cs,
                    ctx.od,
                    ctx.ar,
                    health.drain_rate(),
                    health.recoveries()
                );

                PlayerSession {
                    score: Score::new(setup.name, setup.mods),
                    ctx,
                    input: InputState::new(),
                    processor,
                    health,
                    performance: PerformanceResult::default(),
                    current_katu: 0,
                    current_bad: 0,
                    sudden_death_fail: false,
                }
            })
            .collect();

        let last_end_time = beatmap.end_time();

        log::info!(
            "RULESET: Session ready with {} objects and {} players (calculator: {})",
            beatmap.objects.len(),
            sessions.len(),
            calculator.full_id()
        );

        Ok(Self {
            config,
            queue: (0..beatmap.objects.len()).collect(),
            objects: beatmap.objects,
            judges,
            processed: Vec::new(),
            retired: 0,
            players: sessions,
            calculator,
            events: Vec::new(),
            hit_listener: None,
            end_listener: None,
            fail_listener: None,
            last_end_time,
            ended: false,
        })
    }

    pub fn set_hit_listener(&mut self, listener: impl FnMut(&HitEvent) + Send + 'static) {
        self.hit_listener = Some(Box::new(listener));
    }

    pub fn set_end_listener(&mut self, listener: impl FnMut(f64, usize) + Send + 'static) {
        self.end_listener = Some(Box::new(listener));
    }

    pub fn set_fail_listener(&mut self, listener: impl FnMut(PlayerId) + Send + 'static) {
        self.fail_listener = Some(Box::new(listener));
    }

    /// Advances the session to `time`.
    ///
    /// Activates queued objects, issues time-out judgements, retires resolved
    /// objects, drains health, and ends the session once nothing is left.
    /// Calling it again with the same time has no effect.
    pub fn update(&mut self, time: f64) {
        while let Some(&id) = self.queue.front() {
            if self.judges[id].activation_time() > time {
                break;
            }
            self.queue.pop_front();
            self.processed.push(id);
        }

        for index in 0..self.processed.len() {
            let id = self.processed[index];
            for player in 0..self.players.len() {
                self.judges[id].on_late_update(player, &self.players[player].ctx, time, &mut self.events);
                self.flush_events(id);
            }
        }

        let mut index = 0;
        while index < self.processed.len() {
            let id = self.processed[index];
            if self.judges[id].is_resolved_for_all() {
                self.processed.remove(index);
                self.retired += 1;
                if let Some(listener) = self.end_listener.as_mut() {
                    listener(time, id);
                }
            } else {
                index += 1;
            }
        }

        for (player, session) in self.players.iter_mut().enumerate() {
            let transition = session.health.update(time);
            Self::apply_transition(&mut self.fail_listener, session, player, transition);
        }

        if self.queue.is_empty() && self.processed.is_empty() && !self.ended {
            self.ended = true;
            log::info!("RULESET: Session ended");
            if self.config.log_results {
                for line in self.results_table().lines() {
                    log::info!("{}", line);
                }
            }
        }
    }

    /// Routes a cursor sample's button state to the active objects.
    ///
    /// Every new press is offered to the processed objects in sequence order
    /// until one consumes it. Failed players' presses are ignored.
    pub fn route_click(&mut self, player: PlayerId, sample: CursorSample) {
        let p = player.0;
        let Some(session) = self.players.get_mut(p) else {
            log::warn!("RULESET: Click for unknown player {}", p);
            return;
        };

        let mut presses = session.input.presses(&sample);
        if presses == 0 || session.health.is_failed() {
            return;
        }

        for index in 0..self.processed.len() {
            if presses == 0 {
                break;
            }
            let id = self.processed[index];
            let action = self.can_be_hit(sample.time, index, p);
            let consumed = self.judges[id].on_cursor_click(
                p,
                &self.players[p].ctx,
                &sample,
                action,
                &mut self.events,
            );
            self.flush_events(id);
            if consumed {
                presses -= 1;
            }
        }
    }

    /// Routes cursor movement to the active objects.
    ///
    /// `process_ahead` lets slider tails be checked slightly before their end.
    pub fn route_move(&mut self, player: PlayerId, sample: CursorSample, process_ahead: bool) {
        let p = player.0;
        if p >= self.players.len() {
            log::warn!("RULESET: Move for unknown player {}", p);
            return;
        }

        for index in 0..self.processed.len() {
            let id = self.processed[index];
            self.judges[id].on_cursor_move(
                p,
                &self.players[p].ctx,
                &sample,
                process_ahead,
                &mut self.events,
            );
            self.flush_events(id);
        }
    }

    /// Signals that a player's input ended at `time`. Ending before the last
    /// object is over fails the player.
    pub fn player_stopped(&mut self, player: PlayerId, time: f64) {
        let Some(session) = self.players.get_mut(player.0) else {
            return;
        };

        if time < self.last_end_time - 1.0 {
            log::info!("RULESET: {} stopped early at {:.0}ms", session.score.player, time);
            let transition = session.health.force_fail();
            Self::apply_transition(&mut self.fail_listener, session, player.0, transition);
        }
    }

    /// Notelock decision for the object at `index` in the processed list.
    fn can_be_hit(&self, time: f64, index: usize, player: usize) -> ClickAction {
        let id = self.processed[index];
        let object = &self.objects[id];
        let ctx = &self.players[player].ctx;

        if object.is_circle() && index > 0 {
            let previous = self.processed[index - 1];
            if self.objects[previous].stack_index_for(ctx.mods) > 0
                && !self.judges[previous].is_hit(player)
            {
                return ClickAction::Ignored;
            }
        }

        let tolerance = self.config.tolerance_2b_ms as f64;
        for &other in &self.processed[..index] {
            if !self.judges[other].is_hit(player)
                && self.objects[other].resolved_end_time() + tolerance < object.start_time
            {
                return ClickAction::Shake;
            }
        }

        let mut range = self.config.hittable_range_ms;
        if ctx.check_mod_active(Mods::AUTOPILOT) {
            range -= AUTOPILOT_RANGE_REDUCTION;
        }

        if (time - object.start_time).abs() >= range {
            ClickAction::Shake
        } else {
            ClickAction::Click
        }
    }

    fn flush_events(&mut self, id: usize) {
        if self.events.is_empty() {
            return;
        }
        let mut events = std::mem::take(&mut self.events);
        for event in events.drain(..) {
            self.record_judgement(id, event);
        }
        self.events = events;
    }

    fn is_combo_end(&self, id: usize) -> bool {
        self.objects.get(id + 1).is_none_or(|next| next.new_combo)
    }

    /// Whether every still-processed earlier object of this combo was hit.
    fn combo_fully_clicked(&self, id: usize, player: usize) -> bool {
        let end = self.processed.partition_point(|&other| other < id);
        for &other in self.processed[..end].iter().rev() {
            if !self.judges[other].is_hit(player) {
                return false;
            }
            if self.objects[other].new_combo {
                break;
            }
        }
        true
    }

    fn record_judgement(&mut self, id: usize, event: JudgeEvent) {
        let p = event.player;
        let total_objects = u32::try_from(self.objects.len()).unwrap_or(u32::MAX);
        let combo_end = event.result.is_base() && self.is_combo_end(id);
        let all_clicked = combo_end && self.combo_fully_clicked(id, p);
        let single_player = self.players.len() == 1;

        let Some(session) = self.players.get_mut(p) else {
            return;
        };

        if event.result.is_feedback_only() {
            let suppressed = event.result == HitResult::PositionalMiss
                && session.ctx.check_mod_active(Mods::RELAX);
            if suppressed {
                return;
            }
            if let Some(listener) = self.hit_listener.as_mut() {
                listener(&HitEvent {
                    player: PlayerId(p),
                    time: event.time,
                    object: id,
                    position: event.position,
                    result: event.result,
                    bonus: None,
                    combo: event.combo,
                    performance: session.performance,
                    score: session.processor.score(),
                });
            }
            return;
        }

        let adjusted = session
            .processor
            .adjust_for_modifiers(event.result, event.combo, &session.ctx);
        if adjusted.forced_fail {
            session.sudden_death_fail = true;
        }
        let result = adjusted.result;
        let combo = adjusted.combo;

        session.processor.apply_judgement(result, combo);

        let score = &mut session.score;
        if combo == ComboResult::Reset && result != HitResult::Miss {
            score.stats.combo_breaks += 1;
        }
        score.stats.record(result);

        let combo_state = session.processor.combo_state();
        score.score = session.processor.score();
        score.combo = combo_state.combo;
        score.max_combo = combo_state.max_combo;
        score.perfect_combo = combo_state.perfect;
        score.accuracy = score.stats.accuracy();
        if result.is_base() {
            score.grade = score
                .stats
                .grade(&self.config.grade, session.ctx.is_visually_harder());
        }

        let params = ScoreParams {
            mode: 0,
            mods: session.ctx.mods,
            max_combo: score.max_combo,
            accuracy: score.accuracy,
            misses: score.stats.count_miss,
            passed_objects: if session.ctx.check_mod_active(Mods::RELAX) {
                0
            } else {
                score.stats.judged()
            },
        }
        .clamped(total_objects);
        session.performance = self.calculator.calculate(&params);
        score.pp = session.performance.pp;
        score.stars = session.performance.stars;

        match result {
            HitResult::Hit100 => session.current_katu += 1,
            HitResult::Hit50 | HitResult::Miss => session.current_bad += 1,
            _ => {}
        }

        let mut bonus = None;
        if combo_end {
            if result.is_base_hit() {
                let kind = if session.current_katu == 0 && session.current_bad == 0 && all_clicked {
                    score.stats.count_geki += 1;
                    ComboBonus::Geki
                } else if session.current_bad == 0 && all_clicked {
                    score.stats.count_katu += 1;
                    ComboBonus::Katu
                } else {
                    ComboBonus::Mu
                };
                bonus = Some(kind);
            }
            session.current_katu = 0;
            session.current_bad = 0;
        }

        let transition = if session.sudden_death_fail {
            session.health.force_drain(SUDDEN_DEATH_DRAIN, true)
        } else {
            session.health.apply_judgement(result, bonus)
        };
        Self::apply_transition(&mut self.fail_listener, session, p, transition);

        let hit = HitEvent {
            player: PlayerId(p),
            time: event.time,
            object: id,
            position: event.position,
            result,
            bonus,
            combo,
            performance: session.performance,
            score: session.score.score,
        };

        if let Some(listener) = self.hit_listener.as_mut() {
            listener(&hit);
        }

        let score = &session.score;
        if single_player && self.config.log_hits {
            log::info!(
                "Got: {:>13}, Combo: {:4}, Max Combo: {:4}, Score: {:9}, Acc: {:6.2}%, 300: {:4}, 100: {:3}, 50: {:2}, miss: {:2}, from: {}, at: {:.0}, pos: {:.0}x{:.0}, pp: {:.2}",
                result,
                score.combo,
                score.max_combo,
                score.score,
                score.accuracy,
                score.stats.count_300,
                score.stats.count_100,
                score.stats.count_50,
                score.stats.count_miss,
                id,
                event.time,
                event.position.x,
                event.position.y,
                score.pp
            );
        } else {
            log::debug!(
                "RULESET: {} got {} on #{} at {:.0}ms (combo {}, score {})",
                score.player,
                result,
                id,
                event.time,
                score.combo,
                score.score
            );
        }
    }

    fn apply_transition(
        listener: &mut Option<FailListener>,
        session: &mut PlayerSession,
        player: usize,
        transition: HealthTransition,
    ) {
        match transition {
            HealthTransition::None => {}
            HealthTransition::Recovered => {
                log::info!(
                    "RULESET: {} recovered ({} left)",
                    session.score.player,
                    session.health.recoveries()
                );
            }
            HealthTransition::Failed => {
                session.score.failed = true;
                log::warn!("RULESET: {} failed", session.score.player);
                if let Some(listener) = listener.as_mut() {
                    listener(PlayerId(player));
                }
            }
        }
    }

    /// Final standings, sorted by score.
    pub fn results_table(&self) -> String {
        let mut order: Vec<&PlayerSession> = self.players.iter().collect();
        order.sort_by(|a, b| b.score.score.cmp(&a.score.score));

        let mut table = String::new();
        let _ = writeln!(
            table,
            "{:>2} | {:<16} | {:>10} | {:>8} | {:>5} | {:>5} | {:>4} | {:>4} | {:>4} | {:>5} | {:>9} | {:<10} | {:>8}",
            "#", "Player", "Score", "Accuracy", "Grade", "300", "100", "50", "Miss", "Combo", "Max Combo", "Mods", "PP"
        );
        let _ = writeln!(table, "{}", "-".repeat(128));

        for (rank, session) in order.iter().enumerate() {
            let score = &session.score;
            let _ = writeln!(
                table,
                "{:>2} | {:<16} | {:>10} | {:>8.2} | {:>5} | {:>5} | {:>4} | {:>4} | {:>4} | {:>5} | {:>9} | {:<10} | {:>8.2}",
                rank + 1,
                score.player,
                score.score,
                score.accuracy,
                score.grade,
                score.stats.count_300,
                score.stats.count_100,
                score.stats.count_50,
                score.stats.count_miss,
                score.combo,
                score.max_combo,
                score.mods.to_string(),
                score.pp
            );
        }

        table
    }

    /// Copy of the player's current score.
    pub fn score(&self, player: PlayerId) -> Option<Score> {
        self.players.get(player.0).map(|s| s.score.clone())
    }

    /// Current HP of the player, normalized to 0..=1.
    pub fn hp(&self, player: PlayerId) -> Option<f64> {
        self.players.get(player.0).map(|s| s.health.fraction())
    }

    pub fn is_failed(&self, player: PlayerId) -> bool {
        self.players
            .get(player.0)
            .is_some_and(|s| s.health.is_failed())
    }

    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .position(|s| s.score.player == name)
            .map(PlayerId)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Sequence ids of the active objects, in order.
    pub fn processed(&self) -> &[usize] {
        &self.processed
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn retired(&self) -> usize {
        self.retired
    }

    pub fn objects(&self) -> &[HitObjectSpec] {
        &self.objects
    }

    pub fn judge(&self, id: usize) -> Option<&Judge> {
        self.judges.get(id)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// End time of the last object.
    pub fn end_time(&self) -> f64 {
        self.last_end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::NullCalculator;
    use crate::models::engine::BaseDifficulty;
    use crate::models::settings::HealthConfig;
    use crate::models::stats::Grade;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    const CENTER: Vec2 = Vec2::new(256.0, 192.0);

    fn difficulty(od: f64) -> BaseDifficulty {
        BaseDifficulty {
            hp: 5.0,
            cs: 4.0,
            od,
            ar: 9.0,
        }
    }

    fn single_circle(od: f64) -> Beatmap {
        Beatmap::new(difficulty(od), vec![HitObjectSpec::circle(1000.0, CENTER, true)])
    }

    fn quiet_config() -> RulesetConfig {
        RulesetConfig {
            log_hits: false,
            log_results: false,
            ..RulesetConfig::default()
        }
    }

    fn ruleset(beatmap: Beatmap, players: Vec<PlayerSetup>) -> Ruleset {
        Ruleset::new(beatmap, players, quiet_config(), Box::new(NullCalculator)).unwrap()
    }

    fn solo(mods: Mods) -> Vec<PlayerSetup> {
        vec![PlayerSetup::new("player", mods)]
    }

    fn press(ruleset: &mut Ruleset, player: usize, time: f64, position: Vec2) {
        ruleset.update(time);
        ruleset.route_move(PlayerId(player), CursorSample::new(time, position, true, false), false);
        ruleset.route_click(PlayerId(player), CursorSample::new(time, position, true, false));
        ruleset.route_click(PlayerId(player), CursorSample::new(time, position, false, false));
    }

    #[test]
    fn test_construction_errors() {
        let empty = Beatmap::new(difficulty(5.0), Vec::new());
        assert!(matches!(
            Ruleset::new(empty, solo(Mods::NONE), quiet_config(), Box::new(NullCalculator)),
            Err(RulesetError::EmptyBeatmap)
        ));

        assert!(matches!(
            Ruleset::new(single_circle(5.0), Vec::new(), quiet_config(), Box::new(NullCalculator)),
            Err(RulesetError::NoPlayers)
        ));

        let twice = vec![
            PlayerSetup::new("a", Mods::NONE),
            PlayerSetup::new("a", Mods::HIDDEN),
        ];
        assert!(matches!(
            Ruleset::new(single_circle(5.0), twice, quiet_config(), Box::new(NullCalculator)),
            Err(RulesetError::DuplicatePlayer(name)) if name == "a"
        ));

        let broken = Beatmap::new(
            difficulty(5.0),
            vec![HitObjectSpec::circle(f64::NAN, CENTER, true)],
        );
        assert!(matches!(
            Ruleset::new(broken, solo(Mods::NONE), quiet_config(), Box::new(NullCalculator)),
            Err(RulesetError::InvalidObject { index: 0, .. })
        ));
    }

    #[test]
    fn test_single_circle_300() {
        let mut ruleset = ruleset(single_circle(0.0), solo(Mods::NONE));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        ruleset.set_hit_listener(move |event| sink.lock().unwrap().push(event.clone()));

        press(&mut ruleset, 0, 1005.0, CENTER);

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.count_300, 1);
        assert_eq!(score.combo, 1);
        assert_eq!(score.accuracy, 100.0);
        assert_eq!(score.grade, Grade::SS);

        let hits = hits.lock().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].result, HitResult::Hit300);
        assert_eq!(hits[0].object, 0);
        // Single circle closes its combo cleanly.
        assert_eq!(hits[0].bonus, Some(ComboBonus::Geki));
    }

    #[test]
    fn test_single_circle_timeout_miss() {
        let mut ruleset = ruleset(single_circle(0.0), solo(Mods::NONE));
        let ended = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ended);
        ruleset.set_end_listener(move |time, id| sink.lock().unwrap().push((time, id)));

        let mut time = 0.0;
        while time <= 1300.0 {
            ruleset.update(time);
            time += 10.0;
        }

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.count_miss, 1);
        assert_eq!(score.combo, 0);
        assert!(score.accuracy < 100.0);
        assert_eq!(score.grade, Grade::D);
        assert!(ruleset.is_ended());
        assert_eq!(ended.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::NONE));
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        ruleset.set_hit_listener(move |_| *sink.lock().unwrap() += 1);

        ruleset.update(0.0);
        ruleset.update(1200.0);
        let hp = ruleset.hp(PlayerId(0));
        let seen = *count.lock().unwrap();

        ruleset.update(1200.0);
        assert_eq!(*count.lock().unwrap(), seen);
        assert_eq!(ruleset.hp(PlayerId(0)), hp);
    }

    #[test]
    fn test_players_are_independent() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, CENTER, true),
                HitObjectSpec::circle(1500.0, CENTER, false),
            ],
        );
        let players = vec![
            PlayerSetup::new("a", Mods::NONE),
            PlayerSetup::new("b", Mods::HIDDEN | Mods::HARD_ROCK),
        ];
        let mut ruleset = ruleset(map, players);

        // Only B plays. HR flips y around 192, so the center stays put.
        ruleset.update(0.0);
        press(&mut ruleset, 1, 1000.0, CENTER);
        press(&mut ruleset, 1, 1500.0, CENTER);
        ruleset.update(2000.0);

        let a = ruleset.score(PlayerId(0)).unwrap();
        let b = ruleset.score(PlayerId(1)).unwrap();

        assert_eq!(a.stats.count_miss, 2);
        assert_eq!(a.combo, 0);
        assert_eq!(b.stats.count_300, 2);
        assert_eq!(b.combo, 2);
        assert_eq!(b.grade, Grade::SSH);
        assert!(b.score > a.score);
        assert!(ruleset.hp(PlayerId(1)) > ruleset.hp(PlayerId(0)));
    }

    #[test]
    fn test_recovery_then_fail_once() {
        let map = Beatmap::new(
            difficulty(5.0),
            (0..40)
                .map(|i| HitObjectSpec::circle(1000.0 + 300.0 * f64::from(i), CENTER, i == 0))
                .collect(),
        );
        let config = RulesetConfig {
            health: HealthConfig {
                easy_recoveries: 1,
                ..HealthConfig::default()
            },
            ..quiet_config()
        };
        let mut ruleset = Ruleset::new(map, solo(Mods::EASY), config, Box::new(NullCalculator)).unwrap();

        let fails = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&fails);
        ruleset.set_fail_listener(move |_| *sink.lock().unwrap() += 1);

        let mut recovered_at = None;
        let mut time = 0.0;
        while time <= 15_000.0 {
            ruleset.update(time);
            if recovered_at.is_none() && ruleset.players[0].health.recoveries() == 0 {
                recovered_at = Some(time);
                assert_eq!(*fails.lock().unwrap(), 0);
                assert!(!ruleset.is_failed(PlayerId(0)));
            }
            time += 10.0;
        }

        assert!(recovered_at.is_some());
        assert!(ruleset.is_failed(PlayerId(0)));
        assert_eq!(*fails.lock().unwrap(), 1);
        assert!(ruleset.score(PlayerId(0)).unwrap().failed);
    }

    #[test]
    fn test_failed_player_clicks_are_ignored() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, CENTER, true),
                HitObjectSpec::circle(5000.0, CENTER, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        ruleset.update(0.0);
        ruleset.player_stopped(PlayerId(0), 500.0);
        assert!(ruleset.is_failed(PlayerId(0)));

        press(&mut ruleset, 0, 1000.0, CENTER);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_300, 0);
    }

    #[test]
    fn test_player_stopped_after_end_does_not_fail() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::NO_FAIL));
        ruleset.player_stopped(PlayerId(0), 1000.0);
        assert!(!ruleset.is_failed(PlayerId(0)));
    }

    #[test]
    fn test_sudden_death_fails_on_miss() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, CENTER, true),
                HitObjectSpec::circle(2000.0, CENTER, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::SUDDEN_DEATH));
        ruleset.update(0.0);
        press(&mut ruleset, 0, 1000.0, CENTER);
        assert!(!ruleset.is_failed(PlayerId(0)));

        ruleset.update(2500.0);
        assert!(ruleset.is_failed(PlayerId(0)));
        assert_eq!(ruleset.hp(PlayerId(0)), Some(0.0));
    }

    #[test]
    fn test_perfect_turns_100_into_miss() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::PERFECT | Mods::SUDDEN_DEATH));
        ruleset.update(0.0);
        // OD 5: 300 band is 50ms.
        press(&mut ruleset, 0, 1070.0, CENTER);

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.count_100, 0);
        assert_eq!(score.stats.count_miss, 1);
        assert!(ruleset.is_failed(PlayerId(0)));
    }

    #[test]
    fn test_notelock_shakes_later_object() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, Vec2::new(100.0, 100.0), true),
                HitObjectSpec::circle(1100.0, CENTER, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        ruleset.set_hit_listener(move |event| sink.lock().unwrap().push(event.result));

        ruleset.update(0.0);
        // The first circle is still open, so pressing the second one shakes.
        press(&mut ruleset, 0, 1090.0, CENTER);

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.judged(), 0);
        assert!(hits.lock().unwrap().contains(&HitResult::PositionalMiss));
    }

    #[test]
    fn test_2b_overlap_allows_out_of_order_click() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, Vec2::new(100.0, 100.0), true),
                HitObjectSpec::circle(1002.0, CENTER, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        ruleset.update(0.0);
        press(&mut ruleset, 0, 1002.0, CENTER);

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.count_300, 1);
    }

    #[test]
    fn test_early_press_outside_hittable_range_shakes() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::NONE));
        ruleset.update(0.0);
        press(&mut ruleset, 0, 550.0, CENTER);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.judged(), 0);

        // Inside the range but outside the 50 band: an early miss.
        press(&mut ruleset, 0, 700.0, CENTER);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_miss, 1);
    }

    #[test]
    fn test_katu_on_combo_with_100() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, CENTER, true),
                HitObjectSpec::circle(1500.0, CENTER, false),
                HitObjectSpec::circle(2000.0, CENTER, true),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        ruleset.update(0.0);
        press(&mut ruleset, 0, 1070.0, CENTER);
        press(&mut ruleset, 0, 1500.0, CENTER);
        press(&mut ruleset, 0, 2000.0, CENTER);

        let stats = ruleset.score(PlayerId(0)).unwrap().stats;
        assert_eq!(stats.count_katu, 1);
        assert_eq!(stats.count_geki, 1);
    }

    #[test]
    fn test_slider_break_counts_combo_break() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![HitObjectSpec::slider(
                1000.0,
                1400.0,
                vec![Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0)],
                1,
                100.0,
                true,
            )],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        ruleset.update(0.0);
        press(&mut ruleset, 0, 1000.0, Vec2::new(100.0, 100.0));
        ruleset.route_move(PlayerId(0), CursorSample::hover(1001.0, Vec2::new(100.0, 100.0)), false);
        // Released before the first tick, so every tick is missed.
        ruleset.update(1500.0);

        let score = ruleset.score(PlayerId(0)).unwrap();
        assert_eq!(score.stats.combo_breaks, 3);
        assert_eq!(score.stats.count_50, 1);
        assert!(!score.perfect_combo);
        assert!(ruleset.is_ended());
    }

    #[test]
    fn test_results_table_sorted_by_score() {
        let players = vec![
            PlayerSetup::new("idle", Mods::NONE),
            PlayerSetup::new("clicker", Mods::NONE),
        ];
        let mut ruleset = ruleset(single_circle(5.0), players);
        ruleset.update(0.0);
        press(&mut ruleset, 1, 1000.0, CENTER);
        ruleset.update(2000.0);

        let table = ruleset.results_table();
        let clicker = table.find("clicker").unwrap();
        let idle = table.find("idle").unwrap();
        assert!(clicker < idle);
        assert!(table.starts_with(" # | Player"));
    }

    #[test]
    fn test_clock_jump_resolves_in_one_update() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::NONE));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        ruleset.set_hit_listener(move |event| sink.lock().unwrap().push(event.result));
        let ended = Arc::new(Mutex::new(0usize));
        let end_sink = Arc::clone(&ended);
        ruleset.set_end_listener(move |_, _| *end_sink.lock().unwrap() += 1);

        ruleset.update(0.0);
        ruleset.update(5000.0);
        assert_eq!(*hits.lock().unwrap(), vec![HitResult::Miss]);
        assert!(ruleset.is_ended());
        assert_eq!(ruleset.retired(), 1);

        ruleset.update(5000.0);
        assert_eq!(hits.lock().unwrap().len(), 1);
        assert_eq!(*ended.lock().unwrap(), 1);
    }

    #[test]
    fn test_timeout_waits_for_the_50_band() {
        // OD 0: the 300 band ends at 1080ms, the 50 band at 1200ms.
        let mut ruleset = ruleset(single_circle(0.0), solo(Mods::NONE));
        ruleset.update(0.0);
        ruleset.update(1081.0);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_miss, 0);
        assert_eq!(ruleset.processed(), &[0]);

        ruleset.update(1200.0);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_miss, 0);

        ruleset.update(1201.0);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_miss, 1);
    }

    #[test]
    fn test_stacked_unhit_object_lets_press_fall_through() {
        let stacked = Vec2::new(200.0, 200.0);
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                // Stack offset at CS 4 moves the head 36.48px up-left.
                HitObjectSpec::circle(1000.0, stacked, true).with_stack(10, 10),
                HitObjectSpec::circle(1100.0, stacked, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::NONE));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        ruleset.set_hit_listener(move |event| sink.lock().unwrap().push((event.object, event.result)));

        ruleset.update(0.0);
        press(&mut ruleset, 0, 1090.0, stacked);

        // Only the top of the stack reports the off-target press; the object
        // under it is skipped instead of shaking.
        let hits = hits.lock().unwrap();
        assert_eq!(*hits, vec![(0, HitResult::PositionalMiss)]);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.judged(), 0);
    }

    #[test]
    fn test_relax_hides_positional_misses() {
        let map = Beatmap::new(
            difficulty(5.0),
            vec![
                HitObjectSpec::circle(1000.0, Vec2::new(100.0, 100.0), true),
                HitObjectSpec::circle(1100.0, CENTER, false),
            ],
        );
        let mut ruleset = ruleset(map, solo(Mods::RELAX));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        ruleset.set_hit_listener(move |event| sink.lock().unwrap().push(event.result));

        ruleset.update(0.0);
        press(&mut ruleset, 0, 1090.0, CENTER);

        assert!(hits.lock().unwrap().is_empty());
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.judged(), 0);
    }

    #[derive(Debug, Default)]
    struct RecordingCalculator {
        calls: Arc<Mutex<Vec<ScoreParams>>>,
    }

    impl PerformanceCalculator for RecordingCalculator {
        fn id(&self) -> &str {
            "recording"
        }

        fn display_name(&self) -> &str {
            "Recording"
        }

        fn calculate(&self, params: &ScoreParams) -> PerformanceResult {
            self.calls.lock().unwrap().push(*params);
            PerformanceResult::default()
        }
    }

    fn last_params_after_hit(mods: Mods) -> ScoreParams {
        let calculator = RecordingCalculator::default();
        let calls = Arc::clone(&calculator.calls);
        let mut ruleset = Ruleset::new(
            single_circle(5.0),
            solo(mods),
            quiet_config(),
            Box::new(calculator),
        )
        .unwrap();

        ruleset.update(0.0);
        press(&mut ruleset, 0, 1000.0, CENTER);

        let calls = calls.lock().unwrap();
        *calls.last().unwrap()
    }

    #[test]
    fn test_relax_rates_the_whole_map() {
        let plain = last_params_after_hit(Mods::NONE);
        assert_eq!(plain.passed_objects, 1);
        assert_eq!(plain.max_combo, 1);

        let relax = last_params_after_hit(Mods::RELAX);
        assert_eq!(relax.passed_objects, 0);
        assert_eq!(relax.max_combo, 1);
        assert_eq!(relax.mods, Mods::RELAX);
    }

    #[test]
    fn test_autopilot_narrows_hittable_range() {
        let mut ruleset = ruleset(single_circle(5.0), solo(Mods::AUTOPILOT));
        ruleset.update(0.0);
        // 300ms early: a miss without Autopilot, a shake with it.
        press(&mut ruleset, 0, 700.0, CENTER);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.judged(), 0);

        press(&mut ruleset, 0, 1000.0, CENTER);
        assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.count_300, 1);
    }

    #[test]
    fn test_score_v2_uses_normalized_scoring() {
        let mut legacy = ruleset(single_circle(5.0), solo(Mods::NONE));
        legacy.update(0.0);
        press(&mut legacy, 0, 1000.0, CENTER);
        assert_eq!(legacy.score(PlayerId(0)).unwrap().score, 300);

        let mut v2 = ruleset(single_circle(5.0), solo(Mods::SCORE_V2));
        v2.update(0.0);
        press(&mut v2, 0, 1000.0, CENTER);
        assert_eq!(v2.score(PlayerId(0)).unwrap().score, 1_000_000);
    }

    fn random_map(times: &[u16]) -> Beatmap {
        let mut start = 1000.0;
        let objects = times
            .iter()
            .enumerate()
            .map(|(i, gap)| {
                start += f64::from(*gap);
                let pos = Vec2::new(50.0 + f64::from(*gap % 400), 60.0 + f64::from(*gap % 250));
                match gap % 3 {
                    0 => HitObjectSpec::slider(
                        start,
                        start + 300.0,
                        vec![pos, Vec2::new(pos.x + 100.0, pos.y)],
                        1 + u32::from(gap % 2),
                        75.0,
                        i % 5 == 0,
                    ),
                    1 if gap % 7 == 0 => HitObjectSpec::spinner(start, start + 800.0, true),
                    _ => HitObjectSpec::circle(start, pos, i % 5 == 0),
                }
            })
            .collect();
        Beatmap::new(difficulty(6.0), objects)
    }

    proptest! {
        #[test]
        fn prop_monotonic_and_conserved(
            gaps in prop::collection::vec(50u16..900, 1..25),
            presses in prop::collection::vec((0u16..1000, 0.0f64..512.0, 0.0f64..384.0), 0..60),
        ) {
            let map = random_map(&gaps);
            let total = map.objects.len();
            let end = map.end_time() + 1000.0;
            let mut ruleset = ruleset(map, solo(Mods::NONE));

            let mut presses = presses;
            presses.sort_by_key(|p| p.0);
            let mut next = presses.iter().peekable();

            let mut last_score = 0;
            let mut last_max_combo = 0;
            let mut last_active = total;
            let mut time = 0.0;
            while time <= end {
                ruleset.update(time);

                while let Some((at, x, y)) = next.peek() {
                    let at = f64::from(*at) * (end / 1000.0);
                    if at > time {
                        break;
                    }
                    let position = Vec2::new(*x, *y);
                    ruleset.route_move(PlayerId(0), CursorSample::new(time, position, true, false), false);
                    ruleset.route_click(PlayerId(0), CursorSample::new(time, position, true, false));
                    ruleset.route_click(PlayerId(0), CursorSample::new(time, position, false, false));
                    next.next();
                }

                let score = ruleset.score(PlayerId(0)).unwrap();
                prop_assert!(score.score >= last_score);
                prop_assert!(score.max_combo >= last_max_combo);
                prop_assert!(score.max_combo >= score.combo);
                prop_assert!((0.0..=100.0).contains(&score.accuracy));
                if score.stats.judged() == 0 {
                    prop_assert_eq!(score.accuracy, 100.0);
                }

                let active = ruleset.queued() + ruleset.processed().len();
                prop_assert!(active <= last_active);
                prop_assert_eq!(active + ruleset.retired(), total);
                prop_assert!(ruleset.processed().windows(2).all(|w| w[0] < w[1]));

                last_score = score.score;
                last_max_combo = score.max_combo;
                last_active = active;
                time += 16.0;
            }

            prop_assert!(ruleset.is_ended());
            prop_assert_eq!(ruleset.score(PlayerId(0)).unwrap().stats.judged() as usize, total);
        }
    }
}
