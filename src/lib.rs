//! # Bot Arena
//!
//! A modular Rust crate for orchestrating multi-event bot tournaments: a
//! fixed roster of competitor programs plays a series of games, each game
//! producing an event champion, and the cumulative leaderboard crowns an
//! overall series champion.
//!
//! It provides:
//! - Group construction and round-robin pairing per event (`GroupStageEngine`)
//! - A three-stage state machine: initial groups, final group, tiebreakers
//! - Bounded-parallel match dispatch with stage barriers (`EventManager`)
//! - Pure scoring, rankings and cross-event aggregation (`scoring`)
//! - Fire-and-forget lifecycle events (`EventBus`) and CSV journaling
//!   (`CsvJournal`)
//! - Series orchestration with live snapshots and cooperative cancellation
//!   (`SeriesManager`)
//!
//! Matches run on a worker pool bounded by the configured parallelism; each
//! event's state is guarded by a single mutex, and standings accumulation is
//! commutative, so results may be recorded in any order within a stage.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bot_arena::prelude::*;
//!
//! struct AlwaysRock;
//!
//! impl BotStrategy for AlwaysRock {
//!     fn choose_move(&self, _request: &MoveRequest) -> String {
//!         "rock".to_string()
//!     }
//! }
//!
//! fn main() -> Result<(), bot_arena::error::TournamentError> {
//!     let bots = vec![
//!         Bot::new("rocky", Arc::new(AlwaysRock)),
//!         Bot::new("boulder", Arc::new(AlwaysRock)),
//!         Bot::new("pebble", Arc::new(AlwaysRock)),
//!     ];
//!
//!     let config = SeriesConfig::new(vec![
//!         GameType::RockPaperScissorsLizardSpock,
//!         GameType::ColonelBlotto,
//!     ])
//!     .with_group_count(2)
//!     .with_max_parallel_matches(4);
//!
//!     let bus = Arc::new(EventBus::new());
//!     let events = bus.subscribe();
//!     let manager = SeriesManager::new(
//!         config,
//!         Arc::new(RoundsExecutor::new()),
//!         Arc::new(CsvJournal::new("matches")),
//!         bus,
//!     );
//!
//!     let series = manager.run_series(&bots)?;
//!     println!("champion: {:?}", series.series_champion);
//!     for event in events.try_iter() {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Writing a bot
//!
//! A bot is a name plus a [`BotStrategy`](crate::game_interface::BotStrategy)
//! returning one move per request. Moves are plain strings validated by the
//! game's rules; an illegal move, a panic, or missing the move deadline
//! loses the match for that side — errors are outcomes, never crashes.
#![warn(missing_docs)]

pub use anyhow;

pub mod bot;
pub mod cancel;
pub mod configuration;
pub mod error;
pub mod event_manager;
pub mod game_interface;
pub mod games;
pub mod group_stage;
pub mod journal;
mod logger;
pub mod match_runner;
pub mod publisher;
pub mod scoring;
pub mod series;

pub use logger::init_logger;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use bot_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bot::Bot;
    pub use crate::cancel::CancelToken;
    pub use crate::configuration::SeriesConfig;
    pub use crate::game_interface::{BotStrategy, GameType, MoveRequest};
    pub use crate::group_stage::{EventState, GroupStageEngine, Stage};
    pub use crate::journal::{CsvJournal, MatchJournal, NullJournal};
    pub use crate::match_runner::{MatchExecutor, MatchOutcome, MatchResult, RoundsExecutor};
    pub use crate::publisher::{EventBus, EventPublisher, NullPublisher, TournamentEvent};
    pub use crate::scoring::{SeriesStanding, Standing};
    pub use crate::series::{SeriesInfo, SeriesManager};
}
