//! Shared fixtures: deterministic bots and scripted match executors.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bot_arena::cancel::CancelToken;
use bot_arena::game_interface::{BotStrategy, GameDescriptor, GameType, MoveRequest};
use bot_arena::match_runner::{MatchExecutor, MatchOutcome, MatchResult};
use bot_arena::prelude::Bot;
use time::OffsetDateTime;

/// Strategy that always plays the same move.
pub struct Fixed(pub &'static str);

impl BotStrategy for Fixed {
    fn choose_move(&self, _request: &MoveRequest) -> String {
        self.0.to_string()
    }
}

/// Roster of rock-playing bots with the given names.
pub fn roster(names: &[&str]) -> Vec<Bot> {
    names
        .iter()
        .map(|name| Bot::new(*name, Arc::new(Fixed("rock"))))
        .collect()
}

/// Builds the result a scripted executor reports for one pair.
pub fn scripted_result(
    bot1: &str,
    bot2: &str,
    game_type: GameType,
    outcome: MatchOutcome,
) -> MatchResult {
    let now = OffsetDateTime::now_utc();
    let winner = match outcome {
        MatchOutcome::Player1Wins | MatchOutcome::Player2Error => Some(bot1.to_string()),
        MatchOutcome::Player2Wins | MatchOutcome::Player1Error => Some(bot2.to_string()),
        _ => None,
    };
    MatchResult {
        bot1: bot1.to_string(),
        bot2: bot2.to_string(),
        game_type,
        outcome,
        winner,
        score1: 0,
        score2: 0,
        start_utc: now,
        end_utc: now,
        rounds_log: vec![format!("{bot1} vs {bot2}")],
        errors: vec![],
    }
}

/// Executor whose outcomes come from a closure instead of real play.
pub struct ScriptedExecutor<F> {
    rule: F,
    executed: AtomicUsize,
    cancel_after: Option<usize>,
}

impl<F> ScriptedExecutor<F>
where
    F: Fn(&str, &str, GameType) -> MatchOutcome + Send + Sync,
{
    pub fn new(rule: F) -> Self {
        Self {
            rule,
            executed: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    /// Cancels the token it is handed once `count` matches have executed.
    pub fn cancelling_after(mut self, count: usize) -> Self {
        self.cancel_after = Some(count);
        self
    }
}

impl<F> MatchExecutor for ScriptedExecutor<F>
where
    F: Fn(&str, &str, GameType) -> MatchOutcome + Send + Sync,
{
    fn execute(
        &self,
        bot1: &Bot,
        bot2: &Bot,
        descriptor: &GameDescriptor,
        cancel: &CancelToken,
    ) -> MatchResult {
        let outcome = if cancel.is_cancelled() {
            MatchOutcome::BothError
        } else {
            (self.rule)(&bot1.team_name, &bot2.team_name, descriptor.game_type)
        };
        let done = self.executed.fetch_add(1, Ordering::SeqCst) + 1;
        if self.cancel_after.is_some_and(|count| done >= count) {
            cancel.cancel();
        }
        scripted_result(
            &bot1.team_name,
            &bot2.team_name,
            descriptor.game_type,
            outcome,
        )
    }
}

/// The lexicographically smaller team name wins.
pub fn alphabetical_winner(bot1: &str, bot2: &str, _game: GameType) -> MatchOutcome {
    if bot1 <= bot2 {
        MatchOutcome::Player1Wins
    } else {
        MatchOutcome::Player2Wins
    }
}
