//! Traits and descriptors at the seam between the orchestration core and the
//! game-specific layer.
//!
//! The core never looks inside a game. It hands a [`GameDescriptor`] to the
//! match executor, which drives two [`BotStrategy`] implementations through a
//! per-round [`GameRules`] judge. Concrete rules for the built-in game types
//! live in [`crate::games`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The fixed set of games a series can be played over.
///
/// One tournament event is run per entry in the series configuration; the
/// variant also selects which [`GameRules`] implementation judges the rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    /// Rock-Paper-Scissors-Lizard-Spock, one gesture per round.
    RockPaperScissorsLizardSpock,
    /// Colonel Blotto: both sides split 100 soldiers over five battlefields.
    ColonelBlotto,
    /// Iterated prisoner's dilemma, cooperate or defect each round.
    PrisonersDilemma,
}

impl GameType {
    /// Short identifier used in run ids and file names.
    pub fn slug(&self) -> &'static str {
        match self {
            GameType::RockPaperScissorsLizardSpock => "rpsls",
            GameType::ColonelBlotto => "blotto",
            GameType::PrisonersDilemma => "dilemma",
        }
    }

    /// Number of rounds a match of this game is played over.
    pub fn default_rounds(&self) -> u32 {
        match self {
            GameType::RockPaperScissorsLizardSpock => 5,
            GameType::ColonelBlotto => 9,
            GameType::PrisonersDilemma => 10,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameType::RockPaperScissorsLizardSpock => "RockPaperScissorsLizardSpock",
            GameType::ColonelBlotto => "ColonelBlotto",
            GameType::PrisonersDilemma => "PrisonersDilemma",
        };
        write!(f, "{name}")
    }
}

/// Everything the match executor needs to know to play one match.
#[derive(Debug, Clone)]
pub struct GameDescriptor {
    /// Which game is being played.
    pub game_type: GameType,
    /// Number of rounds before the match is scored.
    pub max_rounds: u32,
    /// Deadline for a single move; exceeding it is an error outcome.
    pub move_timeout: Duration,
    /// Memory cap forwarded to sandboxing executors. The in-process executor
    /// carries it through without enforcing it.
    pub memory_limit_mb: usize,
}

impl GameDescriptor {
    /// Descriptor for `game_type` with its default round count.
    pub fn new(game_type: GameType, move_timeout: Duration, memory_limit_mb: usize) -> Self {
        Self {
            game_type,
            max_rounds: game_type.default_rounds(),
            move_timeout,
            memory_limit_mb,
        }
    }
}

/// State handed to a bot when it is asked for a move.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// The game being played.
    pub game_type: GameType,
    /// Zero-based round number.
    pub round: u32,
    /// Moves this bot played so far in the match, oldest first.
    pub own_history: Vec<String>,
    /// Moves the opponent played so far, oldest first.
    pub opponent_history: Vec<String>,
}

/// The capability bundle of a competitor: produce a move for a game state.
///
/// Implementations must be thread-safe; the executor calls them from worker
/// threads and may drop a session mid-match when the bot misses a deadline.
pub trait BotStrategy: Send + Sync {
    /// Returns this bot's move for the given request.
    ///
    /// The returned string is validated by the game's [`GameRules`]; an
    /// invalid move loses the match for this side.
    fn choose_move(&self, request: &MoveRequest) -> String;
}

/// Who took a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundVerdict {
    /// First player won the round.
    Player1,
    /// Second player won the round.
    Player2,
    /// Neither side won.
    Tie,
}

/// Per-round judge for one game type.
///
/// Implementations are pure: `judge_round` is only called with moves that
/// passed `validate_move` for both sides.
pub trait GameRules: Send + Sync {
    /// The game these rules judge.
    fn game_type(&self) -> GameType;

    /// Checks one side's move for legality.
    ///
    /// # Errors
    /// Returned when the move is not recognized or violates the game's
    /// constraints; the violating side loses the match.
    fn validate_move(&self, mv: &str) -> anyhow::Result<()>;

    /// Decides the round between two pre-validated moves.
    fn judge_round(&self, move1: &str, move2: &str) -> RoundVerdict;
}
