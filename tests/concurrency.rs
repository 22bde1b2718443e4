//! Concurrent recording stress: no loss, no duplication, order-independent
//! standings.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bot_arena::game_interface::GameType;
use bot_arena::group_stage::GroupStageEngine;
use bot_arena::journal::NullJournal;
use bot_arena::prelude::*;
use bot_arena::scoring;

use common::{alphabetical_winner, roster, scripted_result};

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("bot{i:02}")).collect()
}

#[test]
fn concurrent_recording_matches_the_sequential_reference() {
    let config = SeriesConfig::new(vec![GameType::RockPaperScissorsLizardSpock])
        .with_group_count(3);
    let engine = Arc::new(GroupStageEngine::new(
        "stress",
        GameType::RockPaperScissorsLizardSpock,
        1,
        &config,
        Arc::new(NullJournal),
        Arc::new(NullPublisher),
    ));
    let names = names(12);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    engine.initialize(&roster(&refs)).unwrap();

    let pending = engine.next_matches();
    let planned = pending.len();
    assert_eq!(planned, 18); // three groups of four

    let results: Vec<MatchResult> = pending
        .iter()
        .map(|m| {
            scripted_result(
                &m.bot_a,
                &m.bot_b,
                GameType::RockPaperScissorsLizardSpock,
                alphabetical_winner(&m.bot_a, &m.bot_b, GameType::RockPaperScissorsLizardSpock),
            )
        })
        .collect();

    // Sequential reference standings.
    let mut reference = HashMap::new();
    for result in &results {
        scoring::update_standings(result, &mut reference);
    }

    // One worker per match, all recording concurrently.
    let handles: Vec<_> = results
        .into_iter()
        .map(|result| {
            let engine = engine.clone();
            std::thread::spawn(move || engine.record_match_result(result).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let info = engine.tournament_info();
    assert!(engine.next_matches().is_empty());
    assert_eq!(info.match_results.len(), planned);

    // No pair recorded twice.
    let mut pairs: Vec<(String, String)> =
        info.match_results.iter().map(|r| r.pair()).collect();
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), planned);

    for standing in &info.overall_standings {
        let expected = &reference[&standing.team_name];
        assert_eq!(standing.points, expected.points, "{}", standing.team_name);
        assert_eq!(standing.wins, expected.wins);
        assert_eq!(standing.losses, expected.losses);
        assert_eq!(standing.draws, expected.draws);
    }
}

#[test]
fn racing_duplicates_are_rejected_exactly_once() {
    let config = SeriesConfig::new(vec![GameType::RockPaperScissorsLizardSpock])
        .with_group_count(1);
    let engine = Arc::new(GroupStageEngine::new(
        "race",
        GameType::RockPaperScissorsLizardSpock,
        1,
        &config,
        Arc::new(NullJournal),
        Arc::new(NullPublisher),
    ));
    let names = names(6);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    engine.initialize(&roster(&refs)).unwrap();

    let pending = engine.next_matches();
    let planned = pending.len();
    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    // Two competing submissions per pair; exactly one of each must win.
    let handles: Vec<_> = pending
        .iter()
        .flat_map(|m| [m.clone(), m.clone()])
        .map(|m| {
            let engine = engine.clone();
            let accepted = accepted.clone();
            let rejected = rejected.clone();
            std::thread::spawn(move || {
                let result = scripted_result(
                    &m.bot_a,
                    &m.bot_b,
                    GameType::RockPaperScissorsLizardSpock,
                    MatchOutcome::Draw,
                );
                match engine.record_match_result(result) {
                    Ok(_) => accepted.fetch_add(1, Ordering::SeqCst),
                    Err(_) => rejected.fetch_add(1, Ordering::SeqCst),
                };
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(accepted.load(Ordering::SeqCst), planned);
    assert_eq!(rejected.load(Ordering::SeqCst), planned);
    assert_eq!(engine.tournament_info().match_results.len(), planned);
}

#[test]
fn parallel_real_matches_run_a_full_event() {
    // Real executor, real threads: mixed strategies over RPSLS.
    let bots = vec![
        Bot::new("rock", Arc::new(common::Fixed("rock"))),
        Bot::new("paper", Arc::new(common::Fixed("paper"))),
        Bot::new("scissors", Arc::new(common::Fixed("scissors"))),
        Bot::new("lizard", Arc::new(common::Fixed("lizard"))),
        Bot::new("spock", Arc::new(common::Fixed("spock"))),
        Bot::new("stone", Arc::new(common::Fixed("rock"))),
    ];
    let config = SeriesConfig::new(vec![GameType::RockPaperScissorsLizardSpock])
        .with_group_count(1)
        .with_max_parallel_matches(4)
        .with_move_timeout(std::time::Duration::from_millis(500));

    let manager = SeriesManager::new(
        config,
        Arc::new(RoundsExecutor::new()),
        Arc::new(NullJournal),
        Arc::new(NullPublisher),
    );
    let series = manager.run_series(&bots).unwrap();

    assert_eq!(series.events.len(), 1);
    let event = &series.events[0];
    assert_eq!(event.state, EventState::Completed);
    // 15 group matches, plus whatever the final stage needed.
    assert!(event.match_results.len() >= 15);
    assert!(event.champion.is_some());
}
