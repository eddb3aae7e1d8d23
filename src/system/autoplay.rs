//! Autoplay input producer.
//!
//! Builds a cursor timeline that plays every object of a beatmap on the
//! player's own playfield (stacking and Hard Rock applied), with optional
//! timing jitter.

use crate::logic::judge::ball_position;
use crate::models::engine::{Beatmap, CursorSample, DifficultyContext, HitObjectKind, Vec2};
use crate::models::mods::Mods;
use rand::Rng;

/// How long a circle press is held (ms).
const CLICK_HOLD_MS: f64 = 40.0;
/// Spacing of cursor samples while following sliders and spinners (ms).
const SAMPLE_STEP_MS: f64 = 10.0;
/// Cursor distance from the spinner center (px).
const SPIN_RADIUS: f64 = 60.0;
/// Angular speed while spinning (rad/ms), just under the velocity cap.
const SPIN_SPEED: f64 = 0.045;

/// Cursor samples for an autoplay of `beatmap` under `mods`, sorted by time.
///
/// Consecutive objects alternate buttons so overlapping holds never merge.
/// Each object's timing is shifted by a uniform offset in `[-jitter, jitter]`.
pub fn autoplay_samples<R: Rng>(beatmap: &Beatmap, mods: Mods, jitter: f64, rng: &mut R) -> Vec<CursorSample> {
    let ctx = DifficultyContext::new(beatmap.difficulty, mods);
    let scale = ctx.object_scale();
    let mut samples = Vec::new();

    for (index, object) in beatmap.objects.iter().enumerate() {
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        let left = index % 2 == 0;
        let sample = |time: f64, position: Vec2, down: bool| {
            CursorSample::new(time, position, down && left, down && !left)
        };
        let start = object.start_time + offset;

        match object.kind {
            HitObjectKind::Circle => {
                let position = object.stacked_position(mods, scale);
                samples.push(sample(start, position, true));
                samples.push(sample(start + CLICK_HOLD_MS, position, false));
            }
            HitObjectKind::Slider { .. } => {
                samples.push(sample(start, object.stacked_position(mods, scale), true));
                let mut time = object.start_time.max(start) + SAMPLE_STEP_MS;
                while time < object.end_time {
                    let ball = object.transform(ball_position(object, time), mods, scale);
                    samples.push(sample(time, ball, true));
                    time += SAMPLE_STEP_MS;
                }
                let tail = object.transform(ball_position(object, object.end_time), mods, scale);
                samples.push(sample(object.end_time, tail, true));
                samples.push(sample(object.end_time + SAMPLE_STEP_MS, tail, false));
            }
            HitObjectKind::Spinner => {
                let center = object.position;
                let mut time = start;
                let mut angle: f64 = 0.0;
                while time <= object.end_time {
                    let position = Vec2::new(
                        center.x + SPIN_RADIUS * angle.cos(),
                        center.y + SPIN_RADIUS * angle.sin(),
                    );
                    samples.push(sample(time, position, true));
                    time += SAMPLE_STEP_MS;
                    angle += SPIN_SPEED * SAMPLE_STEP_MS;
                }
                samples.push(sample(object.end_time + SAMPLE_STEP_MS, center, false));
            }
        }
    }

    samples.sort_by(|a, b| a.time.total_cmp(&b.time));
    samples
}
