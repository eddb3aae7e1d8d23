//! Beatmap loading for the ruleset.
//!
//! Reads `.osu` files with `rosu-map` and converts the hit objects into the
//! engine's immutable `HitObjectSpec` list. Slider curves are approximated by
//! the polyline through their control points.

use super::difficulty::{BaseDifficulty, difficulty_range};
use super::hit_object::{HitObjectKind, HitObjectSpec, Vec2};
use crate::error::{Result, RulesetError};
use crate::models::mods::Mods;
use rosu_map::section::hit_objects::HitObjectKind as RosuKind;
use std::path::{Path, PathBuf};

/// Distance (px) under which two consecutive circles are considered stacked.
const STACK_DISTANCE: f64 = 3.0;
/// Beat length used when a map has no timing point.
const DEFAULT_BEAT_LEN: f64 = 500.0;

/// A playable beatmap: base difficulty plus time-ordered hit objects.
#[derive(Debug, Clone)]
pub struct Beatmap {
    pub title: String,
    pub version: String,
    pub difficulty: BaseDifficulty,
    pub stack_leniency: f64,
    pub objects: Vec<HitObjectSpec>,
    /// Source file, when loaded from disk.
    pub path: Option<PathBuf>,
}

impl Beatmap {
    /// Builds a beatmap from already prepared objects.
    pub fn new(difficulty: BaseDifficulty, objects: Vec<HitObjectSpec>) -> Self {
        Self {
            title: String::new(),
            version: String::new(),
            difficulty,
            stack_leniency: 0.7,
            objects,
            path: None,
        }
    }

    /// Loads and converts a `.osu` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let map = rosu_map::Beatmap::from_path(path)
            .map_err(|e| RulesetError::Beatmap(format!("{:?}: {}", path, e)))?;

        let mut beatmap = Self::from_rosu(map)?;
        beatmap.path = Some(path.to_path_buf());
        Ok(beatmap)
    }

    /// Converts a parsed `rosu-map` beatmap.
    pub fn from_rosu(mut map: rosu_map::Beatmap) -> Result<Self> {
        let difficulty = BaseDifficulty {
            hp: f64::from(map.hp_drain_rate),
            cs: f64::from(map.circle_size),
            od: f64::from(map.overall_difficulty),
            ar: f64::from(map.approach_rate),
        };

        let beat_lens: Vec<(f64, f64)> = map
            .control_points
            .timing_points
            .iter()
            .map(|tp| (tp.time, tp.beat_len))
            .collect();
        let tick_rate = map.slider_tick_rate;

        let mut objects = Vec::with_capacity(map.hit_objects.len());
        for hit_object in map.hit_objects.iter_mut() {
            let start_time = hit_object.start_time;
            let spec = match &mut hit_object.kind {
                RosuKind::Circle(circle) => HitObjectSpec::circle(
                    start_time,
                    Vec2::new(f64::from(circle.pos.x), f64::from(circle.pos.y)),
                    circle.new_combo,
                ),
                RosuKind::Slider(slider) => {
                    let head = Vec2::new(f64::from(slider.pos.x), f64::from(slider.pos.y));
                    let mut path: Vec<Vec2> = slider
                        .path
                        .control_points()
                        .iter()
                        .map(|cp| Vec2::new(head.x + f64::from(cp.pos.x), head.y + f64::from(cp.pos.y)))
                        .collect();
                    if path.first() != Some(&head) {
                        path.insert(0, head);
                    }
                    path.dedup();

                    let span_count = u32::try_from(slider.repeat_count.max(0)).unwrap_or(0) + 1;
                    let distance = slider
                        .path
                        .expected_dist()
                        .unwrap_or_else(|| polyline_length(&path));
                    let span_duration = if slider.velocity > 0.0 {
                        distance / slider.velocity
                    } else {
                        0.0
                    };
                    let end_time = start_time + span_duration * f64::from(span_count);
                    let tick_interval = if tick_rate > 0.0 {
                        beat_len_at(&beat_lens, start_time) / tick_rate
                    } else {
                        0.0
                    };

                    HitObjectSpec::slider(
                        start_time,
                        end_time,
                        path,
                        span_count,
                        tick_interval,
                        slider.new_combo,
                    )
                }
                RosuKind::Spinner(spinner) => HitObjectSpec::spinner(
                    start_time,
                    start_time + spinner.duration,
                    spinner.new_combo,
                ),
                RosuKind::Hold(_) => {
                    log::warn!("BEATMAP: Skipping hold note at {}ms (not an osu!standard object)", start_time);
                    continue;
                }
            };
            objects.push(spec);
        }

        if objects.is_empty() {
            return Err(RulesetError::EmptyBeatmap);
        }

        objects.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut beatmap = Self {
            title: map.title.clone(),
            version: map.version.clone(),
            difficulty,
            stack_leniency: f64::from(map.stack_leniency),
            objects,
            path: None,
        };
        beatmap.apply_stacking();

        log::info!(
            "BEATMAP: Loaded \"{} [{}]\" with {} objects",
            beatmap.title,
            beatmap.version,
            beatmap.objects.len()
        );

        Ok(beatmap)
    }

    /// Computes stack indices for the normal and the Hard Rock field.
    pub fn apply_stacking(&mut self) {
        let normal = self.stack_threshold(Mods::NONE);
        let hard_rock = self.stack_threshold(Mods::HARD_ROCK);

        let normal_indices = compute_stacks(&self.objects, normal);
        let hr_indices = compute_stacks(&self.objects, hard_rock);

        for ((object, stack), stack_hr) in self
            .objects
            .iter_mut()
            .zip(normal_indices)
            .zip(hr_indices)
        {
            object.stack_index = stack;
            object.stack_index_hr = stack_hr;
        }
    }

    fn stack_threshold(&self, mods: Mods) -> f64 {
        let ar = if mods.active(Mods::HARD_ROCK) {
            (self.difficulty.ar * 1.4).min(10.0)
        } else {
            self.difficulty.ar
        };
        difficulty_range(ar, 1800.0, 1200.0, 450.0) * self.stack_leniency
    }

    /// End time of the last object.
    pub fn end_time(&self) -> f64 {
        self.objects
            .iter()
            .map(HitObjectSpec::resolved_end_time)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Length of the playable section (first start to last end) in ms.
    pub fn drain_time(&self) -> f64 {
        match self.objects.first() {
            Some(first) => (self.end_time() - first.start_time).max(0.0),
            None => 0.0,
        }
    }
}

fn beat_len_at(points: &[(f64, f64)], time: f64) -> f64 {
    points
        .iter()
        .take_while(|(point_time, _)| *point_time <= time)
        .last()
        .or_else(|| points.first())
        .map(|(_, beat_len)| *beat_len)
        .filter(|beat_len| *beat_len > 0.0)
        .unwrap_or(DEFAULT_BEAT_LEN)
}

/// Total length of a polyline.
pub fn polyline_length(path: &[Vec2]) -> f64 {
    path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Old-style stacking: walking backwards, a circle sitting on the next one
/// within the time threshold goes one level deeper than it.
fn compute_stacks(objects: &[HitObjectSpec], threshold: f64) -> Vec<u32> {
    let mut stacks = vec![0u32; objects.len()];

    for i in (0..objects.len()).rev() {
        if !matches!(objects[i].kind, HitObjectKind::Circle) || stacks[i] != 0 {
            continue;
        }

        let mut current = i;
        for j in (0..i).rev() {
            let below = &objects[j];
            if objects[current].start_time - below.resolved_end_time() > threshold {
                break;
            }
            if !below.is_circle() {
                continue;
            }
            if below.position.distance(objects[current].position) < STACK_DISTANCE {
                stacks[j] = stacks[current] + 1;
                current = j;
            }
        }
    }

    stacks
}
