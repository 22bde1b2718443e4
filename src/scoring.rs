//! Pure scoring: match points, standings accumulation, rankings, and the
//! cross-event leaderboard.
//!
//! Everything here is a function of its inputs. Standings updates are
//! commutative and associative per bot, so the engine may record a stage's
//! matches in any order and arrive at the same table.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::match_runner::{MatchOutcome, MatchResult};

/// Points for winning a match.
pub const WIN_POINTS: u32 = 3;
/// Points for a drawn match.
pub const DRAW_POINTS: u32 = 1;

/// One bot's accumulated record within one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Team this standing belongs to.
    pub team_name: String,
    /// Matches won (including walkovers from opponent errors).
    pub wins: u32,
    /// Matches lost (including own errors).
    pub losses: u32,
    /// Matches drawn.
    pub draws: u32,
    /// Accumulated points: win 3, draw 1, loss 0.
    pub points: u32,
    /// Opponents faced, in record order.
    pub opponents: Vec<String>,
    /// True once the bot failed to advance past a stage.
    pub eliminated: bool,
}

impl Standing {
    /// Empty record for `team_name`.
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            ..Self::default()
        }
    }
}

/// Points awarded to each side of a match.
///
/// Error outcomes award the win to the non-erroring side; a double error
/// awards nothing to either.
pub fn score_match(result: &MatchResult) -> (u32, u32) {
    match result.outcome {
        MatchOutcome::Player1Wins | MatchOutcome::Player2Error => (WIN_POINTS, 0),
        MatchOutcome::Player2Wins | MatchOutcome::Player1Error => (0, WIN_POINTS),
        MatchOutcome::Draw => (DRAW_POINTS, DRAW_POINTS),
        MatchOutcome::BothError | MatchOutcome::Unknown => (0, 0),
    }
}

/// Folds one match into the standings table, inserting empty records as
/// needed. Order-independent over any permutation of a stage's results.
pub fn update_standings(result: &MatchResult, table: &mut HashMap<String, Standing>) {
    let (points1, points2) = score_match(result);

    {
        let entry = table
            .entry(result.bot1.clone())
            .or_insert_with(|| Standing::new(result.bot1.clone()));
        entry.points += points1;
        entry.opponents.push(result.bot2.clone());
        match result.outcome {
            MatchOutcome::Player1Wins | MatchOutcome::Player2Error => entry.wins += 1,
            MatchOutcome::Draw => entry.draws += 1,
            _ => entry.losses += 1,
        }
    }
    {
        let entry = table
            .entry(result.bot2.clone())
            .or_insert_with(|| Standing::new(result.bot2.clone()));
        entry.points += points2;
        entry.opponents.push(result.bot1.clone());
        match result.outcome {
            MatchOutcome::Player2Wins | MatchOutcome::Player1Error => entry.wins += 1,
            MatchOutcome::Draw => entry.draws += 1,
            _ => entry.losses += 1,
        }
    }
}

/// Ranking order: points desc, wins desc, losses asc, then team name as a
/// deterministic display-only tiebreak.
pub fn ranking_order(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(b.wins.cmp(&a.wins))
        .then(a.losses.cmp(&b.losses))
        .then(a.team_name.cmp(&b.team_name))
}

/// True when two standings tie on all three primary fields.
///
/// The name sort in [`ranking_order`] does not break such a tie for
/// advancement purposes; it only stabilizes display output.
pub fn primary_tie(a: &Standing, b: &Standing) -> bool {
    a.points == b.points && a.wins == b.wins && a.losses == b.losses
}

/// Standings sorted by [`ranking_order`].
pub fn sorted_standings(table: &HashMap<String, Standing>) -> Vec<Standing> {
    let mut standings: Vec<Standing> = table.values().cloned().collect();
    standings.sort_by(ranking_order);
    standings
}

/// `(team name, placement)` pairs, placement 1-based in ranking order.
pub fn final_rankings(table: &HashMap<String, Standing>) -> Vec<(String, usize)> {
    sorted_standings(table)
        .into_iter()
        .enumerate()
        .map(|(i, s)| (s.team_name, i + 1))
        .collect()
}

/// One bot's cumulative record across the events of a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesStanding {
    /// Team this standing belongs to.
    pub team_name: String,
    /// Points summed over all completed events.
    pub total_points: u32,
    /// Wins summed over all completed events.
    pub total_wins: u32,
    /// Losses summed over all completed events.
    pub total_losses: u32,
    /// Draws summed over all completed events.
    pub total_draws: u32,
    /// Events this bot was champion of.
    pub tournaments_won: u32,
}

/// Series order: total points desc, tournaments won desc, total wins desc,
/// total losses asc, then team name.
pub fn series_order(a: &SeriesStanding, b: &SeriesStanding) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then(b.tournaments_won.cmp(&a.tournaments_won))
        .then(b.total_wins.cmp(&a.total_wins))
        .then(a.total_losses.cmp(&b.total_losses))
        .then(a.team_name.cmp(&b.team_name))
}

/// Additive aggregation of per-event standings into the series leaderboard.
///
/// `events` yields, for each completed event, its overall standings table and
/// its champion.
pub fn series_leaderboard<'a, I>(events: I) -> Vec<SeriesStanding>
where
    I: IntoIterator<Item = (&'a HashMap<String, Standing>, Option<&'a str>)>,
{
    let mut totals: HashMap<String, SeriesStanding> = HashMap::new();
    for (table, champion) in events {
        for standing in table.values() {
            let entry = totals
                .entry(standing.team_name.clone())
                .or_insert_with(|| SeriesStanding {
                    team_name: standing.team_name.clone(),
                    ..SeriesStanding::default()
                });
            entry.total_points += standing.points;
            entry.total_wins += standing.wins;
            entry.total_losses += standing.losses;
            entry.total_draws += standing.draws;
        }
        if let Some(name) = champion {
            if let Some(entry) = totals.get_mut(name) {
                entry.tournaments_won += 1;
            }
        }
    }
    let mut leaderboard: Vec<SeriesStanding> = totals.into_values().collect();
    leaderboard.sort_by(series_order);
    leaderboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_interface::GameType;
    use time::OffsetDateTime;

    fn result(bot1: &str, bot2: &str, outcome: MatchOutcome) -> MatchResult {
        let now = OffsetDateTime::now_utc();
        let winner = match outcome {
            MatchOutcome::Player1Wins | MatchOutcome::Player2Error => Some(bot1.to_string()),
            MatchOutcome::Player2Wins | MatchOutcome::Player1Error => Some(bot2.to_string()),
            _ => None,
        };
        MatchResult {
            bot1: bot1.to_string(),
            bot2: bot2.to_string(),
            game_type: GameType::RockPaperScissorsLizardSpock,
            outcome,
            winner,
            score1: 0,
            score2: 0,
            start_utc: now,
            end_utc: now,
            rounds_log: vec![],
            errors: vec![],
        }
    }

    #[test]
    fn error_outcomes_award_the_walkover() {
        assert_eq!(
            score_match(&result("a", "b", MatchOutcome::Player1Error)),
            (0, WIN_POINTS)
        );
        assert_eq!(
            score_match(&result("a", "b", MatchOutcome::Player2Error)),
            (WIN_POINTS, 0)
        );
        assert_eq!(score_match(&result("a", "b", MatchOutcome::BothError)), (0, 0));
    }

    #[test]
    fn both_error_counts_a_loss_for_each() {
        let mut table = HashMap::new();
        update_standings(&result("a", "b", MatchOutcome::BothError), &mut table);
        assert_eq!(table["a"].losses, 1);
        assert_eq!(table["b"].losses, 1);
        assert_eq!(table["a"].points + table["b"].points, 0);
    }

    #[test]
    fn standings_are_order_independent() {
        let results = [
            result("a", "b", MatchOutcome::Player1Wins),
            result("a", "c", MatchOutcome::Draw),
            result("b", "c", MatchOutcome::Player2Error),
        ];
        let mut forward = HashMap::new();
        for r in &results {
            update_standings(r, &mut forward);
        }
        let mut backward = HashMap::new();
        for r in results.iter().rev() {
            update_standings(r, &mut backward);
        }
        for name in ["a", "b", "c"] {
            let (f, b) = (&forward[name], &backward[name]);
            assert_eq!((f.points, f.wins, f.losses, f.draws), (b.points, b.wins, b.losses, b.draws));
        }
    }

    #[test]
    fn rankings_break_ties_by_name_for_display() {
        let mut table = HashMap::new();
        update_standings(&result("beta", "alpha", MatchOutcome::Draw), &mut table);
        let rankings = final_rankings(&table);
        assert_eq!(rankings[0], ("alpha".to_string(), 1));
        assert_eq!(rankings[1], ("beta".to_string(), 2));
        assert!(primary_tie(&table["alpha"], &table["beta"]));
    }

    #[test]
    fn leaderboard_resolves_ties_in_documented_order() {
        // Two events: "a" sweeps the first, "b" the second; every other pair
        // double-errors. Identical aggregates resolve alphabetically.
        let mut event1 = HashMap::new();
        let mut event2 = HashMap::new();
        for (winner, table) in [("a", &mut event1), ("b", &mut event2)] {
            for other in ["a", "b", "c", "d"] {
                if other != winner {
                    update_standings(&result(winner, other, MatchOutcome::Player1Wins), table);
                }
            }
            let losers: Vec<&str> = ["a", "b", "c", "d"]
                .into_iter()
                .filter(|n| *n != winner)
                .collect();
            for i in 0..losers.len() {
                for j in (i + 1)..losers.len() {
                    update_standings(
                        &result(losers[i], losers[j], MatchOutcome::BothError),
                        table,
                    );
                }
            }
        }
        let leaderboard =
            series_leaderboard([(&event1, Some("a")), (&event2, Some("b"))]);
        assert_eq!(leaderboard[0].team_name, "a");
        assert_eq!(leaderboard[1].team_name, "b");
        assert_eq!(leaderboard[0].total_points, 9);
        assert_eq!(leaderboard[1].total_points, 9);
        assert_eq!(leaderboard[0].total_wins, 3);
        assert_eq!(leaderboard[0].total_losses, 3);
    }
}
