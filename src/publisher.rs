//! Lifecycle event publication.
//!
//! The core publishes fire-and-forget [`TournamentEvent`] values carrying
//! owned snapshots; it never waits on subscribers, and a publisher failure
//! must not abort the tournament. [`EventBus`] fans events out to any number
//! of channel subscribers; [`NullPublisher`] drops them.

use std::sync::Mutex;

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::game_interface::GameType;
use crate::group_stage::{EventState, GroupStandings};
use crate::match_runner::MatchResult;
use crate::scoring::{SeriesStanding, Standing};
use crate::series::SeriesInfo;

/// Position of one event within the series plan.
#[derive(Debug, Clone)]
pub struct SeriesStep {
    /// Zero-based position in the declared order.
    pub index: usize,
    /// Game played at this step.
    pub game_type: GameType,
    /// Current status of the step's event.
    pub status: EventState,
}

/// A lifecycle notification with its value snapshot.
///
/// Every payload is an owned deep copy; none reference mutable core state.
#[derive(Debug, Clone)]
pub enum TournamentEvent {
    /// The series was validated and is about to run its first event.
    TournamentStarted {
        /// Series identifier.
        series_id: String,
        /// Human-readable series name.
        series_name: String,
        /// Ordered event plan with initial statuses.
        steps: Vec<SeriesStep>,
    },
    /// An event was initialized and its initial groups were drawn.
    EventStarted {
        /// Event identifier.
        event_id: String,
        /// Game played in this event.
        game_type: GameType,
        /// One-based position of the event in the series.
        event_number: usize,
        /// Roster size.
        total_bots: usize,
    },
    /// A new stage's matches became pending.
    RoundStarted {
        /// Event identifier.
        event_id: String,
        /// One-based round number within the event.
        round_number: usize,
        /// Label of the stage that opened (`Final Group`, `Tiebreaker-1`, ...).
        stage_label: String,
    },
    /// A match result was recorded.
    MatchCompleted {
        /// Event identifier.
        event_id: String,
        /// Game the match was played under.
        game_type: GameType,
        /// Group the match belonged to.
        group_label: String,
        /// The recorded result.
        result: MatchResult,
    },
    /// Standings changed after a recorded match.
    StandingsUpdated {
        /// Event identifier.
        event_id: String,
        /// Game played in this event.
        game_type: GameType,
        /// Event-wide standings, ranking order.
        overall: Vec<Standing>,
        /// Per-group standings, ranking order within each group.
        per_group: Vec<GroupStandings>,
    },
    /// One series step finished and the next may start.
    EventStepCompleted {
        /// Event identifier.
        event_id: String,
        /// Zero-based step index in the series plan.
        step_index: usize,
        /// Game played at this step.
        game_type: GameType,
        /// Champion of the event, if it completed normally.
        winner: Option<String>,
    },
    /// An event reached `Completed` (or was cancelled without a champion).
    EventCompleted {
        /// Event identifier.
        event_id: String,
        /// Game played in this event.
        game_type: GameType,
        /// Champion, absent when cancelled.
        champion: Option<String>,
    },
    /// Cumulative series state after a completed step.
    TournamentProgressUpdated {
        /// Deep snapshot of the series.
        snapshot: SeriesInfo,
    },
    /// The series finished.
    TournamentCompleted {
        /// Series identifier.
        series_id: String,
        /// Human-readable series name.
        series_name: String,
        /// Overall champion; absent when the series was cancelled.
        series_champion: Option<String>,
        /// Final cumulative leaderboard.
        leaderboard: Vec<SeriesStanding>,
    },
}

/// Sink for lifecycle events. Must not block the core and must not fail.
pub trait EventPublisher: Send + Sync {
    /// Delivers one event. Errors are the publisher's problem.
    fn publish(&self, event: TournamentEvent);
}

/// Publisher that drops everything.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: TournamentEvent) {}
}

/// Broadcast bus delivering every published event to every subscriber.
///
/// Channels are unbounded so publication never blocks match dispatch; a
/// subscriber that went away is skipped silently.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<TournamentEvent>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<TournamentEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().expect("poisoned").push(tx);
        rx
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: TournamentEvent) {
        let subscribers = self.subscribers.lock().expect("poisoned");
        for tx in subscribers.iter() {
            let _ = tx.send(event.clone());
        }
    }
}
