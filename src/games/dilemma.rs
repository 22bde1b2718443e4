use anyhow::bail;

use crate::game_interface::{GameRules, GameType, RoundVerdict};

/// Iterated prisoner's dilemma round judge.
///
/// Moves are `"cooperate"` or `"defect"`. A lone defector takes the round;
/// matching moves tie.
pub struct PrisonersDilemmaRules;

impl GameRules for PrisonersDilemmaRules {
    fn game_type(&self) -> GameType {
        GameType::PrisonersDilemma
    }

    fn validate_move(&self, mv: &str) -> anyhow::Result<()> {
        match mv {
            "cooperate" | "defect" => Ok(()),
            other => bail!("expected 'cooperate' or 'defect', got '{other}'"),
        }
    }

    fn judge_round(&self, move1: &str, move2: &str) -> RoundVerdict {
        match (move1, move2) {
            ("defect", "cooperate") => RoundVerdict::Player1,
            ("cooperate", "defect") => RoundVerdict::Player2,
            _ => RoundVerdict::Tie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_defector_wins() {
        assert_eq!(
            PrisonersDilemmaRules.judge_round("defect", "cooperate"),
            RoundVerdict::Player1
        );
        assert_eq!(
            PrisonersDilemmaRules.judge_round("cooperate", "cooperate"),
            RoundVerdict::Tie
        );
        assert_eq!(
            PrisonersDilemmaRules.judge_round("defect", "defect"),
            RoundVerdict::Tie
        );
    }
}
