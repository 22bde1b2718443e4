//! Match execution: drives a single match between two bots for a given game.
//!
//! The [`MatchExecutor`] trait is the contract the event manager dispatches
//! through; [`RoundsExecutor`] is the default in-process implementation. Each
//! bot runs on its own session thread and is asked for one move per round
//! under the descriptor's move timeout. A timeout, panic or illegal move is
//! recorded as an error *outcome*, never raised — `execute` is infallible.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{instrument, trace, warn};

use crate::bot::Bot;
use crate::cancel::CancelToken;
use crate::game_interface::{BotStrategy, GameDescriptor, GameRules, GameType, MoveRequest, RoundVerdict};

/// Outcome of a single match.
///
/// The discriminant is the integer written to the journal, so the order is
/// load-bearing and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum MatchOutcome {
    /// Placeholder before a match is scored. Never recorded.
    Unknown = 0,
    /// First player won on rounds.
    Player1Wins = 1,
    /// Second player won on rounds.
    Player2Wins = 2,
    /// Equal rounds won.
    Draw = 3,
    /// Both sides errored (or the match was cancelled).
    BothError = 4,
    /// First player timed out, panicked or played an illegal move.
    Player1Error = 5,
    /// Second player timed out, panicked or played an illegal move.
    Player2Error = 6,
}

impl MatchOutcome {
    /// Journal integer for this outcome.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// True for the three error variants.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            MatchOutcome::BothError | MatchOutcome::Player1Error | MatchOutcome::Player2Error
        )
    }
}

/// The scored record of one match between two bots.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// First player's team name.
    pub bot1: String,
    /// Second player's team name.
    pub bot2: String,
    /// Game the match was played under.
    pub game_type: GameType,
    /// How the match ended.
    pub outcome: MatchOutcome,
    /// Winning team name, if any.
    pub winner: Option<String>,
    /// Rounds won by the first player.
    pub score1: u32,
    /// Rounds won by the second player.
    pub score2: u32,
    /// When execution started.
    pub start_utc: OffsetDateTime,
    /// When execution finished.
    pub end_utc: OffsetDateTime,
    /// One human-readable line per played round.
    pub rounds_log: Vec<String>,
    /// Error descriptions for error outcomes.
    pub errors: Vec<String>,
}

impl MatchResult {
    /// Wall-clock duration of the match.
    pub fn duration(&self) -> Duration {
        let delta = self.end_utc - self.start_utc;
        delta.try_into().unwrap_or(Duration::ZERO)
    }

    /// The unordered pair key `(min, max)` identifying this match.
    pub fn pair(&self) -> (String, String) {
        if self.bot1 <= self.bot2 {
            (self.bot1.clone(), self.bot2.clone())
        } else {
            (self.bot2.clone(), self.bot1.clone())
        }
    }
}

/// Executes a single match. Implementations must never fail: every problem
/// is folded into the returned [`MatchResult`].
pub trait MatchExecutor: Send + Sync {
    /// Plays `bot1` against `bot2` under `descriptor`, honoring `cancel`.
    fn execute(
        &self,
        bot1: &Bot,
        bot2: &Bot,
        descriptor: &GameDescriptor,
        cancel: &CancelToken,
    ) -> MatchResult;
}

/// A bot running on its own thread, queried one move at a time.
///
/// The in-process counterpart of a sandboxed child process: requests go down
/// one channel, moves come back on another, and the caller enforces the
/// deadline with `recv_timeout`. A strategy stuck past its deadline keeps its
/// thread until the process exits; it is never queried again.
struct BotSession {
    request_tx: mpsc::Sender<MoveRequest>,
    move_rx: mpsc::Receiver<String>,
}

impl BotSession {
    fn spawn(strategy: Arc<dyn BotStrategy>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<MoveRequest>();
        let (move_tx, move_rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let mv = strategy.choose_move(&request);
                if move_tx.send(mv).is_err() {
                    break;
                }
            }
        });
        Self {
            request_tx,
            move_rx,
        }
    }

    fn request_move(&self, request: MoveRequest, timeout: Duration) -> Result<String, String> {
        if self.request_tx.send(request).is_err() {
            return Err("session terminated (strategy panicked?)".to_string());
        }
        match self.move_rx.recv_timeout(timeout) {
            Ok(mv) => Ok(mv),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(format!("no move within {timeout:?}"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err("session terminated (strategy panicked?)".to_string())
            }
        }
    }
}

/// Default executor: plays `descriptor.max_rounds` rounds, one move per bot
/// per round, judged by the registered [`GameRules`].
pub struct RoundsExecutor {
    rules: HashMap<GameType, Arc<dyn GameRules>>,
}

impl RoundsExecutor {
    /// Executor with all built-in game rules registered.
    pub fn new() -> Self {
        let mut rules: HashMap<GameType, Arc<dyn GameRules>> = HashMap::new();
        for r in crate::games::builtin_rules() {
            rules.insert(r.game_type(), r);
        }
        Self { rules }
    }

    /// Registers (or replaces) the rules for one game type.
    #[must_use]
    pub fn with_rules(mut self, rules: Arc<dyn GameRules>) -> Self {
        self.rules.insert(rules.game_type(), rules);
        self
    }
}

impl Default for RoundsExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchExecutor for RoundsExecutor {
    #[instrument(skip_all, fields(VS = format!("[{} VS {}]", bot1.team_name, bot2.team_name)))]
    fn execute(
        &self,
        bot1: &Bot,
        bot2: &Bot,
        descriptor: &GameDescriptor,
        cancel: &CancelToken,
    ) -> MatchResult {
        trace!("match started");
        let start_utc = OffsetDateTime::now_utc();

        let rules = match self.rules.get(&descriptor.game_type) {
            Some(rules) => rules,
            None => {
                warn!("no rules registered for {}", descriptor.game_type);
                return finish(
                    bot1,
                    bot2,
                    descriptor,
                    start_utc,
                    0,
                    0,
                    vec![],
                    vec![format!("no rules registered for {}", descriptor.game_type)],
                    Some(MatchOutcome::BothError),
                );
            }
        };

        let session1 = BotSession::spawn(bot1.strategy());
        let session2 = BotSession::spawn(bot2.strategy());

        let mut score1 = 0u32;
        let mut score2 = 0u32;
        let mut history1: Vec<String> = vec![];
        let mut history2: Vec<String> = vec![];
        let mut rounds_log: Vec<String> = vec![];
        let mut errors: Vec<String> = vec![];
        let mut fail1 = false;
        let mut fail2 = false;

        for round in 0..descriptor.max_rounds {
            if cancel.is_cancelled() {
                errors.push("match cancelled".to_string());
                fail1 = true;
                fail2 = true;
                break;
            }

            let move1 = fetch_move(
                &session1,
                rules.as_ref(),
                descriptor,
                round,
                &history1,
                &history2,
            );
            let move2 = fetch_move(
                &session2,
                rules.as_ref(),
                descriptor,
                round,
                &history2,
                &history1,
            );

            match (move1, move2) {
                (Ok(m1), Ok(m2)) => {
                    let verdict = rules.judge_round(&m1, &m2);
                    match verdict {
                        RoundVerdict::Player1 => score1 += 1,
                        RoundVerdict::Player2 => score2 += 1,
                        RoundVerdict::Tie => {}
                    }
                    rounds_log.push(format!(
                        "Round {}: {} vs {} -> {}",
                        round + 1,
                        m1,
                        m2,
                        match verdict {
                            RoundVerdict::Player1 => &bot1.team_name,
                            RoundVerdict::Player2 => &bot2.team_name,
                            RoundVerdict::Tie => "tie",
                        }
                    ));
                    history1.push(m1);
                    history2.push(m2);
                }
                (r1, r2) => {
                    if let Err(e) = r1 {
                        warn!("{} errored: {e}", bot1.team_name);
                        errors.push(format!("{}: {e}", bot1.team_name));
                        fail1 = true;
                    }
                    if let Err(e) = r2 {
                        warn!("{} errored: {e}", bot2.team_name);
                        errors.push(format!("{}: {e}", bot2.team_name));
                        fail2 = true;
                    }
                    break;
                }
            }
        }

        let forced = match (fail1, fail2) {
            (true, true) => Some(MatchOutcome::BothError),
            (true, false) => Some(MatchOutcome::Player1Error),
            (false, true) => Some(MatchOutcome::Player2Error),
            (false, false) => None,
        };

        trace!("match end");
        finish(
            bot1, bot2, descriptor, start_utc, score1, score2, rounds_log, errors, forced,
        )
    }
}

fn fetch_move(
    session: &BotSession,
    rules: &dyn GameRules,
    descriptor: &GameDescriptor,
    round: u32,
    own_history: &[String],
    opponent_history: &[String],
) -> Result<String, String> {
    let request = MoveRequest {
        game_type: descriptor.game_type,
        round,
        own_history: own_history.to_vec(),
        opponent_history: opponent_history.to_vec(),
    };
    let mv = session.request_move(request, descriptor.move_timeout)?;
    rules
        .validate_move(&mv)
        .map_err(|e| format!("illegal move: {e}"))?;
    Ok(mv)
}

#[allow(clippy::too_many_arguments)]
fn finish(
    bot1: &Bot,
    bot2: &Bot,
    descriptor: &GameDescriptor,
    start_utc: OffsetDateTime,
    score1: u32,
    score2: u32,
    rounds_log: Vec<String>,
    errors: Vec<String>,
    forced: Option<MatchOutcome>,
) -> MatchResult {
    let outcome = forced.unwrap_or_else(|| match score1.cmp(&score2) {
        std::cmp::Ordering::Greater => MatchOutcome::Player1Wins,
        std::cmp::Ordering::Less => MatchOutcome::Player2Wins,
        std::cmp::Ordering::Equal => MatchOutcome::Draw,
    });
    let winner = match outcome {
        MatchOutcome::Player1Wins | MatchOutcome::Player2Error => Some(bot1.team_name.clone()),
        MatchOutcome::Player2Wins | MatchOutcome::Player1Error => Some(bot2.team_name.clone()),
        _ => None,
    };
    MatchResult {
        bot1: bot1.team_name.clone(),
        bot2: bot2.team_name.clone(),
        game_type: descriptor.game_type,
        outcome,
        winner,
        score1,
        score2,
        start_utc,
        end_utc: OffsetDateTime::now_utc(),
        rounds_log,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_interface::GameType;

    struct Fixed(&'static str);

    impl BotStrategy for Fixed {
        fn choose_move(&self, _request: &MoveRequest) -> String {
            self.0.to_string()
        }
    }

    struct Sleeper;

    impl BotStrategy for Sleeper {
        fn choose_move(&self, _request: &MoveRequest) -> String {
            std::thread::sleep(Duration::from_secs(5));
            "rock".to_string()
        }
    }

    fn descriptor(game_type: GameType) -> GameDescriptor {
        GameDescriptor::new(game_type, Duration::from_millis(200), 512)
    }

    #[test]
    fn paper_sweeps_rock() {
        let executor = RoundsExecutor::new();
        let rock = Bot::new("rock", Arc::new(Fixed("rock")));
        let paper = Bot::new("paper", Arc::new(Fixed("paper")));
        let result = executor.execute(
            &rock,
            &paper,
            &descriptor(GameType::RockPaperScissorsLizardSpock),
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, MatchOutcome::Player2Wins);
        assert_eq!(result.winner.as_deref(), Some("paper"));
        assert_eq!((result.score1, result.score2), (0, 5));
        assert_eq!(result.rounds_log.len(), 5);
    }

    #[test]
    fn mirror_match_is_a_draw() {
        let executor = RoundsExecutor::new();
        let a = Bot::new("a", Arc::new(Fixed("spock")));
        let b = Bot::new("b", Arc::new(Fixed("spock")));
        let result = executor.execute(
            &a,
            &b,
            &descriptor(GameType::RockPaperScissorsLizardSpock),
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, MatchOutcome::Draw);
        assert!(result.winner.is_none());
    }

    #[test]
    fn timeout_loses_the_match() {
        let executor = RoundsExecutor::new();
        let slow = Bot::new("slow", Arc::new(Sleeper));
        let fast = Bot::new("fast", Arc::new(Fixed("rock")));
        let result = executor.execute(
            &slow,
            &fast,
            &descriptor(GameType::RockPaperScissorsLizardSpock),
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, MatchOutcome::Player1Error);
        assert_eq!(result.winner.as_deref(), Some("fast"));
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn illegal_move_errors_the_offender() {
        let executor = RoundsExecutor::new();
        let cheat = Bot::new("cheat", Arc::new(Fixed("dynamite")));
        let fair = Bot::new("fair", Arc::new(Fixed("lizard")));
        let result = executor.execute(
            &cheat,
            &fair,
            &descriptor(GameType::RockPaperScissorsLizardSpock),
            &CancelToken::new(),
        );
        assert_eq!(result.outcome, MatchOutcome::Player1Error);
    }

    #[test]
    fn cancellation_is_both_error_not_a_failure() {
        let executor = RoundsExecutor::new();
        let a = Bot::new("a", Arc::new(Fixed("rock")));
        let b = Bot::new("b", Arc::new(Fixed("rock")));
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = executor.execute(
            &a,
            &b,
            &descriptor(GameType::RockPaperScissorsLizardSpock),
            &cancel,
        );
        assert_eq!(result.outcome, MatchOutcome::BothError);
        assert!(result.errors.iter().any(|e| e.contains("cancelled")));
    }

    #[test]
    fn outcome_codes_are_stable() {
        assert_eq!(MatchOutcome::Unknown.code(), 0);
        assert_eq!(MatchOutcome::Player1Wins.code(), 1);
        assert_eq!(MatchOutcome::Player2Wins.code(), 2);
        assert_eq!(MatchOutcome::Draw.code(), 3);
        assert_eq!(MatchOutcome::BothError.code(), 4);
        assert_eq!(MatchOutcome::Player1Error.code(), 5);
        assert_eq!(MatchOutcome::Player2Error.code(), 6);
    }
}
