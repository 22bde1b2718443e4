//! Config for series behaviors.
//!
//! A [`SeriesConfig`] is built programmatically with the chainable `with_*`
//! methods or overlaid from environment variables via
//! [`SeriesConfig::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional; unparsable values fall back to the default.
//!
//! - `ARENA_GROUP_COUNT` — requested number of initial groups (default: `10`)
//! - `ARENA_FINALISTS_PER_GROUP` — bots advancing per initial group (default: `1`)
//! - `ARENA_USE_TIEBREAKERS` — `"false"` disables tiebreaker stages (default: `true`)
//! - `ARENA_MAX_PARALLEL_MATCHES` — concurrent match cap (default: `max(2, CPU)`)
//! - `ARENA_MOVE_TIMEOUT_MS` — per-move deadline in milliseconds (default: `1000`)
//! - `ARENA_MEMORY_LIMIT_MB` — per-bot memory cap forwarded to the executor (default: `512`)

use std::env;
use std::time::Duration;

use crate::game_interface::{GameDescriptor, GameType};

/// Configuration for one tournament series.
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    pub(crate) series_name: String,
    pub(crate) game_types: Vec<GameType>,
    pub(crate) group_count: usize,
    pub(crate) finalists_per_group: usize,
    pub(crate) use_tiebreakers: bool,
    pub(crate) tiebreaker_game: Option<GameType>,
    pub(crate) max_parallel_matches: usize,
    pub(crate) move_timeout: Duration,
    pub(crate) memory_limit_mb: usize,
}

impl SeriesConfig {
    /// Create a configuration for the given ordered game types, one event
    /// per entry, with default parameters.
    ///
    /// By default:
    /// - Up to 10 initial groups per event, top-1 advancing from each.
    /// - Ties in the final group trigger tiebreaker stages.
    /// - Tiebreakers are played under the event's own game.
    /// - Match parallelism is bounded by `max(2, CPU count)`.
    /// - Moves time out after one second.
    pub fn new(game_types: Vec<GameType>) -> Self {
        Self {
            series_name: "Bot Arena Series".to_string(),
            game_types,
            group_count: 10,
            finalists_per_group: 1,
            use_tiebreakers: true,
            tiebreaker_game: None,
            max_parallel_matches: default_parallelism(),
            move_timeout: Duration::from_secs(1),
            memory_limit_mb: 512,
        }
    }

    /// Create configuration from environment variables on top of the
    /// defaults of [`new`](Self::new). Game types cannot come from the
    /// environment and are passed explicitly.
    pub fn from_env(game_types: Vec<GameType>) -> Self {
        fn parse_usize(var: &str) -> Option<usize> {
            env::var(var).ok()?.parse().ok()
        }

        fn parse_duration_millis(var: &str) -> Option<Duration> {
            env::var(var)
                .ok()?
                .parse::<u64>()
                .ok()
                .map(Duration::from_millis)
        }

        let mut config = Self::new(game_types);
        if let Some(v) = parse_usize("ARENA_GROUP_COUNT") {
            config.group_count = v;
        }
        if let Some(v) = parse_usize("ARENA_FINALISTS_PER_GROUP") {
            config.finalists_per_group = v;
        }
        if let Ok(v) = env::var("ARENA_USE_TIEBREAKERS") {
            config.use_tiebreakers = !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = parse_usize("ARENA_MAX_PARALLEL_MATCHES") {
            config.max_parallel_matches = v;
        }
        if let Some(v) = parse_duration_millis("ARENA_MOVE_TIMEOUT_MS") {
            config.move_timeout = v;
        }
        if let Some(v) = parse_usize("ARENA_MEMORY_LIMIT_MB") {
            config.memory_limit_mb = v;
        }
        config
    }

    /// Sets the display name of the series.
    #[must_use]
    pub fn with_series_name(mut self, name: impl Into<String>) -> Self {
        self.series_name = name.into();
        self
    }

    /// Sets the requested number of initial groups per event.
    ///
    /// The effective count is clamped so that no group has fewer than two
    /// bots and there are never more than ten groups.
    #[must_use]
    pub fn with_group_count(mut self, count: usize) -> Self {
        self.group_count = count;
        self
    }

    /// Sets how many bots advance from each initial group.
    #[must_use]
    pub fn with_finalists_per_group(mut self, count: usize) -> Self {
        self.finalists_per_group = count;
        self
    }

    /// Enables or disables tiebreaker stages.
    ///
    /// When disabled, a tie in the final group is broken by team name sort.
    #[must_use]
    pub fn with_use_tiebreakers(mut self, value: bool) -> Self {
        self.use_tiebreakers = value;
        self
    }

    /// Plays tiebreaker-stage matches under a different game.
    #[must_use]
    pub fn with_tiebreaker_game(mut self, game_type: GameType) -> Self {
        self.tiebreaker_game = Some(game_type);
        self
    }

    /// Sets the upper bound on concurrent match executions.
    #[must_use]
    pub fn with_max_parallel_matches(mut self, count: usize) -> Self {
        self.max_parallel_matches = count;
        self
    }

    /// Sets the per-move deadline enforced by the match executor.
    #[must_use]
    pub fn with_move_timeout(mut self, timeout: Duration) -> Self {
        self.move_timeout = timeout;
        self
    }

    /// Sets the per-bot memory cap forwarded to the match executor.
    #[must_use]
    pub fn with_memory_limit_mb(mut self, limit: usize) -> Self {
        self.memory_limit_mb = limit;
        self
    }

    /// Ordered game types, one event per entry.
    pub fn game_types(&self) -> &[GameType] {
        &self.game_types
    }

    /// Effective dispatch parallelism: the configured cap, itself bounded by
    /// `max(2, CPU count)`.
    pub fn effective_parallelism(&self) -> usize {
        self.max_parallel_matches
            .min(default_parallelism())
            .max(1)
    }

    /// Descriptor for a match of `game_type` under this configuration.
    pub(crate) fn descriptor_for(&self, game_type: GameType) -> GameDescriptor {
        GameDescriptor::new(game_type, self.move_timeout, self.memory_limit_mb)
    }

    /// Game used for tiebreaker-stage matches of an event playing
    /// `event_game`.
    pub(crate) fn tiebreaker_game_for(&self, event_game: GameType) -> GameType {
        self.tiebreaker_game.unwrap_or(event_game)
    }
}

fn default_parallelism() -> usize {
    num_cpus::get().max(2)
}
