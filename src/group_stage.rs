//! The per-event state machine: group construction, pairing, stage barriers,
//! tie resolution and rankings.
//!
//! One [`GroupStageEngine`] owns all mutation of a single event behind one
//! mutex. Matches are admitted in any order within a stage; a stage advances
//! only once every one of its matches is recorded, and the engine decides
//! whether the event completes, opens the final group, or schedules a
//! tiebreaker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, trace};

use crate::bot::Bot;
use crate::configuration::SeriesConfig;
use crate::error::TournamentError;
use crate::game_interface::GameType;
use crate::journal::MatchJournal;
use crate::match_runner::{MatchOutcome, MatchResult};
use crate::publisher::{EventPublisher, TournamentEvent};
use crate::scoring::{self, Standing};

/// Label of the final group stage.
pub const FINAL_GROUP_LABEL: &str = "Final Group";

/// Lifecycle of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventState {
    /// Created but not initialized.
    NotStarted,
    /// Groups drawn, matches being played.
    InProgress,
    /// A champion was crowned.
    Completed,
    /// Aborted; standings reflect what was recorded.
    Cancelled,
}

/// The stage an in-progress event is currently in. Each stage is a barrier:
/// all of its matches complete before the next stage is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Round-robin within each initial group.
    InitialGroups,
    /// Round-robin among the advancing bots.
    FinalGroup,
    /// N-th extra stage among tied leaders.
    Tiebreaker(u32),
}

/// A match waiting to be played in the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMatch {
    /// One side of the unordered pair.
    pub bot_a: String,
    /// The other side.
    pub bot_b: String,
    /// Group this match belongs to.
    pub group_label: String,
}

impl PendingMatch {
    fn is_pair(&self, bot1: &str, bot2: &str) -> bool {
        (self.bot_a == bot1 && self.bot_b == bot2) || (self.bot_a == bot2 && self.bot_b == bot1)
    }
}

/// Standings of one group, ranking order.
#[derive(Debug, Clone)]
pub struct GroupStandings {
    /// Group label.
    pub label: String,
    /// Member standings, best first.
    pub standings: Vec<Standing>,
}

/// Immutable snapshot of one event. Never aliases engine internals.
#[derive(Debug, Clone)]
pub struct EventInfo {
    /// Event identifier.
    pub event_id: String,
    /// Game played in this event.
    pub game_type: GameType,
    /// Lifecycle state.
    pub state: EventState,
    /// Current stage (meaningful while `InProgress`).
    pub stage: Stage,
    /// Roster, input order.
    pub bots: Vec<String>,
    /// Every recorded match, record order.
    pub match_results: Vec<MatchResult>,
    /// Group labels per round, round order.
    pub bracket: Vec<Vec<String>>,
    /// Champion once `Completed`.
    pub champion: Option<String>,
    /// When the event was initialized.
    pub start_utc: OffsetDateTime,
    /// When the event completed or was cancelled.
    pub end_utc: Option<OffsetDateTime>,
    /// One-based number of the round in progress.
    pub current_round: usize,
    /// Rounds known so far (grows when tiebreakers are scheduled).
    pub total_rounds: usize,
    /// Event-wide standings, ranking order.
    pub overall_standings: Vec<Standing>,
    /// Per-group standings, group creation order.
    pub group_standings: Vec<GroupStandings>,
}

struct EngineInner {
    state: EventState,
    stage: Stage,
    roster: Vec<String>,
    pending: Vec<PendingMatch>,
    match_results: Vec<MatchResult>,
    // Creation-ordered (label, members) plus per-label standings tables.
    groups: Vec<(String, Vec<String>)>,
    standings: HashMap<String, HashMap<String, Standing>>,
    bracket: Vec<Vec<String>>,
    champion: Option<String>,
    start_utc: OffsetDateTime,
    end_utc: Option<OffsetDateTime>,
    tiebreakers: u32,
}

/// What [`GroupStageEngine::advance_round`] decided, for publication.
enum Advance {
    NewStage { label: String, round: usize },
    Champion(String),
}

/// Single-writer state machine for one event.
///
/// All public operations are safe under concurrent callers; mutation happens
/// under one internal mutex held only for the critical section. Journaling
/// and event publication happen after the lock is released.
pub struct GroupStageEngine {
    event_id: String,
    game_type: GameType,
    event_number: usize,
    group_count: usize,
    finalists_per_group: usize,
    use_tiebreakers: bool,
    inner: Mutex<EngineInner>,
    journal: Arc<dyn MatchJournal>,
    publisher: Arc<dyn EventPublisher>,
}

impl GroupStageEngine {
    /// Creates an engine in the `NotStarted` state.
    pub fn new(
        event_id: impl Into<String>,
        game_type: GameType,
        event_number: usize,
        config: &SeriesConfig,
        journal: Arc<dyn MatchJournal>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            game_type,
            event_number,
            group_count: config.group_count,
            finalists_per_group: config.finalists_per_group.max(1),
            use_tiebreakers: config.use_tiebreakers,
            inner: Mutex::new(EngineInner {
                state: EventState::NotStarted,
                stage: Stage::InitialGroups,
                roster: vec![],
                pending: vec![],
                match_results: vec![],
                groups: vec![],
                standings: HashMap::new(),
                bracket: vec![],
                champion: None,
                start_utc: OffsetDateTime::now_utc(),
                end_utc: None,
                tiebreakers: 0,
            }),
            journal,
            publisher,
        }
    }

    /// Identifier of the event this engine runs.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Game played in this event.
    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Draws the initial groups and schedules their round-robin matches.
    ///
    /// Bots are distributed round-robin across
    /// `clamp(min(requested, n/2), 1, 10)` groups in input order, so group
    /// sizes differ by at most one and no group is smaller than two.
    ///
    /// # Errors
    /// `InvalidState` when already initialized; `InvalidConfig` for fewer
    /// than two bots or duplicate team names.
    pub fn initialize(&self, bots: &[Bot]) -> Result<EventInfo, TournamentError> {
        let snapshot = {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.state != EventState::NotStarted {
                return Err(TournamentError::InvalidState(format!(
                    "initialize called in state {:?}",
                    inner.state
                )));
            }
            if bots.len() < 2 {
                return Err(TournamentError::InvalidConfig(format!(
                    "an event needs at least two bots, got {}",
                    bots.len()
                )));
            }
            let mut roster: Vec<String> = Vec::with_capacity(bots.len());
            for bot in bots {
                if roster.contains(&bot.team_name) {
                    return Err(TournamentError::InvalidConfig(format!(
                        "duplicate team name '{}'",
                        bot.team_name
                    )));
                }
                roster.push(bot.team_name.clone());
            }

            let count = effective_group_count(self.group_count, roster.len());
            let mut members: Vec<Vec<String>> = vec![vec![]; count];
            for (i, name) in roster.iter().enumerate() {
                members[i % count].push(name.clone());
            }

            inner.roster = roster;
            inner.start_utc = OffsetDateTime::now_utc();
            let mut labels = Vec::with_capacity(count);
            for (index, group) in members.into_iter().enumerate() {
                let label = initial_group_label(index);
                open_group(&mut inner, label.clone(), group);
                labels.push(label);
            }
            inner.bracket.push(labels);
            inner.state = EventState::InProgress;
            inner.stage = Stage::InitialGroups;
            info!(
                "event {} initialized: {} bots in {} groups, {} matches",
                self.event_id,
                inner.roster.len(),
                count,
                inner.pending.len()
            );
            self.snapshot(&inner)
        };

        self.publisher.publish(TournamentEvent::EventStarted {
            event_id: self.event_id.clone(),
            game_type: self.game_type,
            event_number: self.event_number,
            total_bots: snapshot.bots.len(),
        });
        Ok(snapshot)
    }

    /// Pending matches of the current stage. Idempotent until results are
    /// recorded.
    pub fn next_matches(&self) -> Vec<PendingMatch> {
        self.inner.lock().expect("poisoned").pending.clone()
    }

    /// Group label the pair currently belongs to.
    ///
    /// # Errors
    /// `NotPending` when the pair is not scheduled in the current stage.
    pub fn match_group_label(
        &self,
        bot1: &str,
        bot2: &str,
    ) -> Result<String, TournamentError> {
        let inner = self.inner.lock().expect("poisoned");
        inner
            .pending
            .iter()
            .find(|m| m.is_pair(bot1, bot2))
            .map(|m| m.group_label.clone())
            .ok_or_else(|| TournamentError::NotPending(bot1.to_string(), bot2.to_string()))
    }

    /// Admits one match result: removes the pair from pending, appends it to
    /// the history, folds it into the group standings, journals it and
    /// publishes `MatchCompleted` + `StandingsUpdated`.
    ///
    /// # Errors
    /// `InvalidState` outside `InProgress` or for an `Unknown` outcome,
    /// `UnknownBot` for a name outside the roster, `NotPending` for a
    /// duplicate or wrong-stage pair.
    pub fn record_match_result(
        &self,
        result: MatchResult,
    ) -> Result<EventInfo, TournamentError> {
        let (snapshot, group_label) = {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.state != EventState::InProgress {
                return Err(TournamentError::InvalidState(format!(
                    "record_match_result called in state {:?}",
                    inner.state
                )));
            }
            if result.outcome == MatchOutcome::Unknown {
                return Err(TournamentError::InvalidState(
                    "a recorded result must have a known outcome".to_string(),
                ));
            }
            for name in [&result.bot1, &result.bot2] {
                if !inner.roster.contains(name) {
                    return Err(TournamentError::UnknownBot(name.clone()));
                }
            }
            let position = inner
                .pending
                .iter()
                .position(|m| m.is_pair(&result.bot1, &result.bot2))
                .ok_or_else(|| {
                    TournamentError::NotPending(result.bot1.clone(), result.bot2.clone())
                })?;
            let pending = inner.pending.remove(position);
            let label = pending.group_label.clone();

            let table = inner.standings.entry(label.clone()).or_default();
            scoring::update_standings(&result, table);
            inner.match_results.push(result.clone());
            trace!(
                "recorded {} vs {} in {} ({:?}), {} pending",
                result.bot1,
                result.bot2,
                label,
                result.outcome,
                inner.pending.len()
            );
            (self.snapshot(&inner), label)
        };

        self.journal.append(&result, &group_label);
        self.publisher.publish(TournamentEvent::MatchCompleted {
            event_id: self.event_id.clone(),
            game_type: self.game_type,
            group_label,
            result,
        });
        self.publisher.publish(TournamentEvent::StandingsUpdated {
            event_id: self.event_id.clone(),
            game_type: self.game_type,
            overall: snapshot.overall_standings.clone(),
            per_group: snapshot.group_standings.clone(),
        });
        Ok(snapshot)
    }

    /// Advances past the current stage once all of its matches are recorded.
    ///
    /// From the initial groups this computes the advancing set (top
    /// finalists per group, leaders tied on points/wins/losses included) and
    /// opens the final group; from the final group or a tiebreaker it either
    /// crowns a unique leader or schedules the next tiebreaker among the
    /// tied ones.
    ///
    /// # Errors
    /// `InvalidState` while matches are still pending or when the event is
    /// not `InProgress`.
    pub fn advance_round(&self) -> Result<EventInfo, TournamentError> {
        let (snapshot, advance) = {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.state != EventState::InProgress {
                return Err(TournamentError::InvalidState(format!(
                    "advance_round called in state {:?}",
                    inner.state
                )));
            }
            if !inner.pending.is_empty() {
                return Err(TournamentError::InvalidState(format!(
                    "{} matches of the current stage are still pending",
                    inner.pending.len()
                )));
            }
            let advance = match inner.stage {
                Stage::InitialGroups => self.advance_from_initial(&mut inner),
                Stage::FinalGroup => self.resolve_leaders(&mut inner, FINAL_GROUP_LABEL),
                Stage::Tiebreaker(n) => {
                    let label = tiebreaker_label(n);
                    self.resolve_leaders(&mut inner, &label)
                }
            };
            (self.snapshot(&inner), advance)
        };

        match advance {
            Advance::NewStage { label, round } => {
                self.publisher.publish(TournamentEvent::RoundStarted {
                    event_id: self.event_id.clone(),
                    round_number: round,
                    stage_label: label,
                });
            }
            Advance::Champion(champion) => {
                info!("event {} champion: {champion}", self.event_id);
                self.publisher.publish(TournamentEvent::EventCompleted {
                    event_id: self.event_id.clone(),
                    game_type: self.game_type,
                    champion: Some(champion),
                });
            }
        }
        Ok(snapshot)
    }

    /// Moves the event to `Cancelled` (no-op once `Completed`) and publishes
    /// a champion-less `EventCompleted`.
    pub fn cancel(&self) -> EventInfo {
        let snapshot = {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.state != EventState::Completed && inner.state != EventState::Cancelled {
                inner.state = EventState::Cancelled;
                inner.end_utc = Some(OffsetDateTime::now_utc());
                inner.pending.clear();
                debug!("event {} cancelled", self.event_id);
            }
            self.snapshot(&inner)
        };
        if snapshot.state == EventState::Cancelled {
            self.publisher.publish(TournamentEvent::EventCompleted {
                event_id: self.event_id.clone(),
                game_type: self.game_type,
                champion: None,
            });
        }
        snapshot
    }

    /// Deep snapshot of the event.
    pub fn tournament_info(&self) -> EventInfo {
        let inner = self.inner.lock().expect("poisoned");
        self.snapshot(&inner)
    }

    /// `(team name, placement)` over the event-wide standings, usable before
    /// and after completion.
    pub fn final_rankings(&self) -> Vec<(String, usize)> {
        let inner = self.inner.lock().expect("poisoned");
        scoring::final_rankings(&overall_table(&inner))
    }

    fn advance_from_initial(&self, inner: &mut EngineInner) -> Advance {
        let initial_labels = inner.bracket[0].clone();
        let mut advancing: Vec<String> = vec![];
        for label in &initial_labels {
            let table = inner.standings.get(label).cloned().unwrap_or_default();
            let sorted = scoring::sorted_standings(&table);
            let mut cut = self.finalists_per_group.min(sorted.len());
            // Leaders tied with the last qualifier on all primary fields
            // advance as well.
            while cut < sorted.len() && scoring::primary_tie(&sorted[cut - 1], &sorted[cut]) {
                cut += 1;
            }
            for standing in &sorted[..cut] {
                advancing.push(standing.team_name.clone());
            }
            mark_eliminated(inner, label, sorted[cut..].iter().map(|s| &s.team_name));
        }
        debug!(
            "event {}: {} bots advance to the final stage",
            self.event_id,
            advancing.len()
        );

        if advancing.len() > 1 && initial_labels.len() == 1 {
            // A sole initial group already played the full round-robin among
            // the advancers; replaying it as a final group decides nothing.
            // The advancers are tied leaders, so resolve the tie directly.
            let label = initial_labels[0].clone();
            return self.open_tie_stage(inner, advancing, &label);
        }

        open_group(inner, FINAL_GROUP_LABEL.to_string(), advancing);
        inner.bracket.push(vec![FINAL_GROUP_LABEL.to_string()]);
        inner.stage = Stage::FinalGroup;
        Advance::NewStage {
            label: FINAL_GROUP_LABEL.to_string(),
            round: inner.bracket.len(),
        }
    }

    fn resolve_leaders(&self, inner: &mut EngineInner, label: &str) -> Advance {
        let table = inner.standings.get(label).cloned().unwrap_or_default();
        let sorted = scoring::sorted_standings(&table);
        let leaders: Vec<String> = sorted
            .iter()
            .take_while(|s| scoring::primary_tie(s, &sorted[0]))
            .map(|s| s.team_name.clone())
            .collect();
        mark_eliminated(
            inner,
            label,
            sorted[leaders.len()..].iter().map(|s| &s.team_name),
        );

        if leaders.len() == 1 {
            return self.crown(inner, leaders.into_iter().next().expect("one leader"));
        }
        self.open_tie_stage(inner, leaders, label)
    }

    /// Tied leaders either play a tiebreaker stage or, with tiebreakers
    /// disabled, the tie falls to the name sort.
    fn open_tie_stage(
        &self,
        inner: &mut EngineInner,
        mut leaders: Vec<String>,
        tied_label: &str,
    ) -> Advance {
        if !self.use_tiebreakers {
            leaders.sort();
            let champion = leaders.into_iter().next().expect("tied leaders");
            return self.crown(inner, champion);
        }
        inner.tiebreakers += 1;
        let n = inner.tiebreakers;
        let label = tiebreaker_label(n);
        debug!(
            "event {}: {} leaders tied in {tied_label}, scheduling {label}",
            self.event_id,
            leaders.len()
        );
        open_group(inner, label.clone(), leaders);
        inner.bracket.push(vec![label.clone()]);
        inner.stage = Stage::Tiebreaker(n);
        Advance::NewStage {
            label,
            round: inner.bracket.len(),
        }
    }

    fn crown(&self, inner: &mut EngineInner, champion: String) -> Advance {
        inner.state = EventState::Completed;
        inner.end_utc = Some(OffsetDateTime::now_utc());
        inner.champion = Some(champion.clone());
        Advance::Champion(champion)
    }

    fn snapshot(&self, inner: &EngineInner) -> EventInfo {
        let group_standings = inner
            .groups
            .iter()
            .map(|(label, _members)| GroupStandings {
                label: label.clone(),
                standings: scoring::sorted_standings(
                    inner.standings.get(label).unwrap_or(&HashMap::new()),
                ),
            })
            .collect();
        let total_rounds = match inner.stage {
            // A multi-group initial stage is always followed by a final round.
            Stage::InitialGroups if inner.bracket.first().is_some_and(|l| l.len() > 1) => {
                inner.bracket.len() + 1
            }
            _ => inner.bracket.len(),
        };
        EventInfo {
            event_id: self.event_id.clone(),
            game_type: self.game_type,
            state: inner.state,
            stage: inner.stage,
            bots: inner.roster.clone(),
            match_results: inner.match_results.clone(),
            bracket: inner.bracket.clone(),
            champion: inner.champion.clone(),
            start_utc: inner.start_utc,
            end_utc: inner.end_utc,
            current_round: inner.bracket.len(),
            total_rounds,
            overall_standings: scoring::sorted_standings(&overall_table(inner)),
            group_standings,
        }
    }
}

fn effective_group_count(requested: usize, bots: usize) -> usize {
    requested.min(bots / 2).clamp(1, 10)
}

fn initial_group_label(index: usize) -> String {
    // Ten groups at most, so a single letter always suffices.
    let letter = (b'A' + index as u8) as char;
    format!("Group {letter}")
}

fn tiebreaker_label(n: u32) -> String {
    format!("Tiebreaker-{n}")
}

/// Registers a group: members, zeroed standings, and all pairwise matches.
fn open_group(inner: &mut EngineInner, label: String, members: Vec<String>) {
    let table = inner.standings.entry(label.clone()).or_default();
    for name in &members {
        table.insert(name.clone(), Standing::new(name.clone()));
    }
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            inner.pending.push(PendingMatch {
                bot_a: members[i].clone(),
                bot_b: members[j].clone(),
                group_label: label.clone(),
            });
        }
    }
    inner.groups.push((label, members));
}

fn mark_eliminated<'a>(
    inner: &mut EngineInner,
    label: &str,
    names: impl Iterator<Item = &'a String>,
) {
    if let Some(table) = inner.standings.get_mut(label) {
        for name in names {
            if let Some(standing) = table.get_mut(name) {
                standing.eliminated = true;
            }
        }
    }
}

fn overall_table(inner: &EngineInner) -> HashMap<String, Standing> {
    let mut overall: HashMap<String, Standing> = inner
        .roster
        .iter()
        .map(|name| (name.clone(), Standing::new(name.clone())))
        .collect();
    for (label, _members) in &inner.groups {
        let Some(table) = inner.standings.get(label) else {
            continue;
        };
        for standing in table.values() {
            let entry = overall
                .entry(standing.team_name.clone())
                .or_insert_with(|| Standing::new(standing.team_name.clone()));
            entry.wins += standing.wins;
            entry.losses += standing.losses;
            entry.draws += standing.draws;
            entry.points += standing.points;
            entry.opponents.extend(standing.opponents.iter().cloned());
            entry.eliminated |= standing.eliminated;
        }
    }
    overall
}
