//! Gameplay logic: judges, health, scoring and the ruleset that ties them
//! together, plus the logic thread that feeds the ruleset from an `InputBus`.

pub mod health;
pub mod judge;
pub mod player;
pub mod ruleset;
pub mod score;

use crate::logic::ruleset::{PlayerId, Ruleset};
use crate::system::bus::{InputBus, InputFrame, SessionEvent};
use std::io;
use std::thread::{self, JoinHandle};

/// Spawns the logic thread.
///
/// Frames are applied in arrival order: every frame first advances the clock
/// to its time, then routes movement and buttons. When every producer has
/// dropped its sender the ruleset is run past the last object and handed back.
pub fn start_thread(bus: InputBus, mut ruleset: Ruleset) -> io::Result<JoinHandle<Ruleset>> {
    let hit_tx = bus.event_tx.clone();
    ruleset.set_hit_listener(move |event| {
        let _ = hit_tx.send(SessionEvent::Hit(event.clone()));
    });
    let end_tx = bus.event_tx.clone();
    ruleset.set_end_listener(move |time, object| {
        let _ = end_tx.send(SessionEvent::ObjectEnded { time, object });
    });
    let fail_tx = bus.event_tx.clone();
    ruleset.set_fail_listener(move |player| {
        let _ = fail_tx.send(SessionEvent::Failed(player));
    });

    let InputBus {
        input_tx,
        input_rx,
        event_tx,
        ..
    } = bus;
    // Only producers may keep the input channel open.
    drop(input_tx);

    thread::Builder::new()
        .name("Logic Thread".to_string())
        .spawn(move || {
            log::info!("LOGIC: Thread started");

            let mut clock = f64::NEG_INFINITY;
            let mut frames = 0usize;

            for frame in input_rx.iter() {
                frames += 1;
                match frame {
                    InputFrame::Cursor {
                        player,
                        sample,
                        process_ahead,
                    } => {
                        clock = clock.max(sample.time);
                        ruleset.update(clock);
                        ruleset.route_move(player, sample, process_ahead);
                        ruleset.route_click(player, sample);
                    }
                    InputFrame::Stopped { player, time } => {
                        clock = clock.max(time);
                        ruleset.update(clock);
                        ruleset.player_stopped(player, time);
                    }
                    InputFrame::Tick { time } => {
                        clock = clock.max(time);
                        ruleset.update(clock);
                    }
                }
            }

            finish(&mut ruleset, clock);
            let _ = event_tx.send(SessionEvent::Ended);
            log::info!("LOGIC: Thread finished after {} frames", frames);
            ruleset
        })
}

/// Runs the clock past the last object so every pending judgement resolves.
pub fn finish(ruleset: &mut Ruleset, clock: f64) {
    let end = ruleset.end_time();
    let mut time = clock.max(0.0);
    while !ruleset.is_ended() && time <= end + 1000.0 {
        time += 10.0;
        ruleset.update(time);
    }

    for player in (0..ruleset.player_count()).map(PlayerId) {
        if ruleset.score(player).is_some_and(|s| !s.failed) {
            ruleset.player_stopped(player, time);
        }
    }
}
