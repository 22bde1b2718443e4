use thiserror::Error;

/// Failures surfaced by the orchestration core.
///
/// Match execution problems are *not* errors: they are recorded as
/// [`MatchOutcome`](crate::match_runner::MatchOutcome) values and fed into the
/// standings. The variants here are either configuration mistakes or
/// programmer-error state violations that callers must not retry.
#[derive(Debug, Error)]
pub enum TournamentError {
    /// The series cannot start with the given configuration or roster.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation was called in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A match result referenced a bot that is not part of the event.
    #[error("unknown bot: {0}")]
    UnknownBot(String),
    /// The pair is not pending in the current stage (duplicate or wrong stage).
    #[error("pair {0} vs {1} is not pending in the current stage")]
    NotPending(String, String),
}
