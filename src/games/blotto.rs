use anyhow::{bail, Context};

use crate::game_interface::{GameRules, GameType, RoundVerdict};

/// Colonel Blotto round judge.
///
/// A move allocates exactly [`TOTAL_SOLDIERS`] soldiers over
/// [`BATTLEFIELDS`] battlefields as a comma-separated list, e.g.
/// `"20,20,20,20,20"`. The side winning more battlefields takes the round.
pub struct ColonelBlottoRules;

/// Number of battlefields per round.
pub const BATTLEFIELDS: usize = 5;
/// Soldiers each side must allocate per round.
pub const TOTAL_SOLDIERS: u32 = 100;

fn parse(mv: &str) -> anyhow::Result<Vec<u32>> {
    let fields = mv
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .with_context(|| format!("invalid allocation '{part}'"))
        })
        .collect::<anyhow::Result<Vec<u32>>>()?;
    if fields.len() != BATTLEFIELDS {
        bail!("expected {BATTLEFIELDS} battlefields, got {}", fields.len());
    }
    let total: u32 = fields.iter().sum();
    if total != TOTAL_SOLDIERS {
        bail!("allocations must sum to {TOTAL_SOLDIERS}, got {total}");
    }
    Ok(fields)
}

impl GameRules for ColonelBlottoRules {
    fn game_type(&self) -> GameType {
        GameType::ColonelBlotto
    }

    fn validate_move(&self, mv: &str) -> anyhow::Result<()> {
        parse(mv).map(|_| ())
    }

    fn judge_round(&self, move1: &str, move2: &str) -> RoundVerdict {
        // Both moves passed validate_move.
        let (a, b) = match (parse(move1), parse(move2)) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return RoundVerdict::Tie,
        };
        let mut won1 = 0;
        let mut won2 = 0;
        for (x, y) in a.iter().zip(b.iter()) {
            if x > y {
                won1 += 1;
            } else if y > x {
                won2 += 1;
            }
        }
        match won1.cmp(&won2) {
            std::cmp::Ordering::Greater => RoundVerdict::Player1,
            std::cmp::Ordering::Less => RoundVerdict::Player2,
            std::cmp::Ordering::Equal => RoundVerdict::Tie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concentration_beats_spread_on_majority() {
        // 34/33/33 on the first three fields wins three battlefields.
        let verdict = ColonelBlottoRules.judge_round("34,33,33,0,0", "20,20,20,20,20");
        assert_eq!(verdict, RoundVerdict::Player1);
    }

    #[test]
    fn mirrored_allocations_tie() {
        let verdict = ColonelBlottoRules.judge_round("20,20,20,20,20", "20,20,20,20,20");
        assert_eq!(verdict, RoundVerdict::Tie);
    }

    #[test]
    fn rejects_wrong_totals_and_arity() {
        assert!(ColonelBlottoRules.validate_move("50,50").is_err());
        assert!(ColonelBlottoRules.validate_move("50,50,50,0,0").is_err());
        assert!(ColonelBlottoRules.validate_move("nope").is_err());
        assert!(ColonelBlottoRules.validate_move("20,20,20,20,20").is_ok());
    }
}
