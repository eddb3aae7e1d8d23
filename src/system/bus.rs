//! Channel infrastructure between the input producers and the logic thread.
//!
//! Producers push `InputFrame`s in time order; the logic thread drains them
//! into the ruleset and answers with a `SessionEvent` stream.

use crate::logic::ruleset::{HitEvent, PlayerId};
use crate::models::engine::CursorSample;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

/// One unit of player input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFrame {
    /// Cursor state at a point in time. Buttons and movement are routed together.
    Cursor {
        player: PlayerId,
        sample: CursorSample,
        process_ahead: bool,
    },
    /// The player's input ended at `time`.
    Stopped { player: PlayerId, time: f64 },
    /// Advance the clock without input.
    Tick { time: f64 },
}

/// Notifications sent back from the logic thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Hit(HitEvent),
    ObjectEnded { time: f64, object: usize },
    Failed(PlayerId),
    Ended,
}

/// Aggregates the producer → logic → consumer channels.
#[derive(Clone)]
pub struct InputBus {
    /// Producers → Logic: time-ordered input frames.
    pub input_tx: Sender<InputFrame>,
    pub input_rx: Receiver<InputFrame>,

    /// Logic → Consumers: judgements and lifecycle events.
    pub event_tx: Sender<SessionEvent>,
    pub event_rx: Receiver<SessionEvent>,
}

impl InputBus {
    pub fn new() -> Self {
        let (input_tx, input_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        Self {
            input_tx,
            input_rx,
            event_tx,
            event_rx,
        }
    }

    /// Bus whose input channel holds at most `capacity` frames, so producers
    /// cannot run arbitrarily far ahead of the logic thread.
    pub fn with_capacity(capacity: usize) -> Self {
        let (input_tx, input_rx) = bounded(capacity);
        let (event_tx, event_rx) = unbounded();

        Self {
            input_tx,
            input_rx,
            event_tx,
            event_rx,
        }
    }
}

impl Default for InputBus {
    fn default() -> Self {
        Self::new()
    }
}
