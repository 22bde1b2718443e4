use anyhow::bail;

use crate::game_interface::{GameRules, GameType, RoundVerdict};

/// Rock-Paper-Scissors-Lizard-Spock round judge.
///
/// Moves are the lowercase gesture names. Each gesture beats exactly two
/// others; identical gestures tie.
pub struct RpslsRules;

const GESTURES: [&str; 5] = ["rock", "paper", "scissors", "lizard", "spock"];

fn beats(a: &str, b: &str) -> bool {
    matches!(
        (a, b),
        ("rock", "scissors")
            | ("rock", "lizard")
            | ("paper", "rock")
            | ("paper", "spock")
            | ("scissors", "paper")
            | ("scissors", "lizard")
            | ("lizard", "paper")
            | ("lizard", "spock")
            | ("spock", "rock")
            | ("spock", "scissors")
    )
}

impl GameRules for RpslsRules {
    fn game_type(&self) -> GameType {
        GameType::RockPaperScissorsLizardSpock
    }

    fn validate_move(&self, mv: &str) -> anyhow::Result<()> {
        if GESTURES.contains(&mv) {
            Ok(())
        } else {
            bail!("unknown gesture '{mv}'")
        }
    }

    fn judge_round(&self, move1: &str, move2: &str) -> RoundVerdict {
        if move1 == move2 {
            RoundVerdict::Tie
        } else if beats(move1, move2) {
            RoundVerdict::Player1
        } else {
            RoundVerdict::Player2
        }
    }
}
