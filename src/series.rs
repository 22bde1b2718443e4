//! Runs an ordered list of events over one roster and aggregates the
//! cross-event leaderboard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::bot::Bot;
use crate::cancel::CancelToken;
use crate::configuration::SeriesConfig;
use crate::error::TournamentError;
use crate::event_manager::EventManager;
use crate::group_stage::{EventInfo, EventState, GroupStandings, GroupStageEngine};
use crate::journal::MatchJournal;
use crate::match_runner::{MatchExecutor, MatchResult};
use crate::publisher::{EventPublisher, SeriesStep, TournamentEvent};
use crate::scoring::{self, SeriesStanding, Standing};

/// Immutable snapshot of a whole series.
#[derive(Debug, Clone)]
pub struct SeriesInfo {
    /// Series identifier.
    pub series_id: String,
    /// Human-readable series name.
    pub series_name: String,
    /// Per-event snapshots, declared order.
    pub events: Vec<EventInfo>,
    /// Cumulative leaderboard over completed events.
    pub series_standings: Vec<SeriesStanding>,
    /// Overall champion once the series completed normally.
    pub series_champion: Option<String>,
    /// When the series run started.
    pub start_utc: OffsetDateTime,
    /// When the series run finished.
    pub end_utc: Option<OffsetDateTime>,
}

struct SeriesState {
    series_id: String,
    engines: Vec<Arc<GroupStageEngine>>,
    series_standings: Vec<SeriesStanding>,
    series_champion: Option<String>,
    start_utc: OffsetDateTime,
    end_utc: Option<OffsetDateTime>,
}

/// Orchestrates one series: one event per configured game type, run strictly
/// in order over a shared roster.
///
/// The manager is safe to share behind an `Arc`: `run_series` drives the
/// tournament while the snapshot getters serve observers with independent
/// deep copies, and [`cancel`](SeriesManager::cancel) may be called from any
/// thread.
pub struct SeriesManager {
    config: SeriesConfig,
    executor: Arc<dyn MatchExecutor>,
    journal: Arc<dyn MatchJournal>,
    publisher: Arc<dyn EventPublisher>,
    cancel: CancelToken,
    state: Mutex<SeriesState>,
}

impl SeriesManager {
    /// Creates a manager wiring the executor, journal and publisher into
    /// every event of the series.
    pub fn new(
        config: SeriesConfig,
        executor: Arc<dyn MatchExecutor>,
        journal: Arc<dyn MatchJournal>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            executor,
            journal,
            publisher,
            cancel: CancelToken::new(),
            state: Mutex::new(SeriesState {
                series_id: String::new(),
                engines: vec![],
                series_standings: vec![],
                series_champion: None,
                start_utc: OffsetDateTime::now_utc(),
                end_utc: None,
            }),
        }
    }

    /// The cancellation token propagated to every event and match.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests cooperative cancellation of the whole series.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs every configured event in order and returns the final snapshot.
    ///
    /// # Errors
    /// `InvalidConfig` for an empty game list, fewer than two bots or
    /// duplicate team names. State violations reported by an engine mid-run
    /// propagate as `InvalidState`; the series is marked cancelled and the
    /// completion event is published without a champion before returning.
    #[instrument(skip_all, fields(series = self.config.series_name))]
    pub fn run_series(&self, bots: &[Bot]) -> Result<SeriesInfo, TournamentError> {
        self.validate(bots)?;
        let series_id = format!(
            "series-{}",
            OffsetDateTime::now_utc().unix_timestamp()
        );
        info!(
            "series {series_id} ({}): {} events over {} bots",
            self.config.series_name,
            self.config.game_types.len(),
            bots.len()
        );

        let engines: Vec<Arc<GroupStageEngine>> = self
            .config
            .game_types
            .iter()
            .enumerate()
            .map(|(index, game_type)| {
                Arc::new(GroupStageEngine::new(
                    format!("{series_id}-{}-{}", game_type.slug(), index + 1),
                    *game_type,
                    index + 1,
                    &self.config,
                    self.journal.clone(),
                    self.publisher.clone(),
                ))
            })
            .collect();

        {
            let mut state = self.state.lock().expect("poisoned");
            state.series_id = series_id.clone();
            state.engines = engines.clone();
            state.series_standings = vec![];
            state.series_champion = None;
            state.start_utc = OffsetDateTime::now_utc();
            state.end_utc = None;
        }

        self.publisher.publish(TournamentEvent::TournamentStarted {
            series_id: series_id.clone(),
            series_name: self.config.series_name.clone(),
            steps: engines
                .iter()
                .enumerate()
                .map(|(index, engine)| SeriesStep {
                    index,
                    game_type: engine.game_type(),
                    status: EventState::NotStarted,
                })
                .collect(),
        });

        let mut run_error: Option<TournamentError> = None;
        for (index, engine) in engines.iter().enumerate() {
            if self.cancel.is_cancelled() {
                engine.cancel();
                continue;
            }

            self.journal.start_run(engine.event_id(), engine.game_type());
            let info = engine
                .initialize(bots)
                .and_then(|_| {
                    let manager = EventManager::new(
                        self.executor.clone(),
                        self.config.clone(),
                        self.cancel.clone(),
                    );
                    manager.run(engine, bots)
                });
            let info = match info {
                Ok(info) => info,
                Err(e) => {
                    // Unrecoverable fault: stop the series, keep what was
                    // recorded, finish without a champion.
                    warn!("event {} failed: {e}", engine.event_id());
                    self.cancel.cancel();
                    engine.cancel();
                    run_error = Some(e);
                    continue;
                }
            };

            if info.state == EventState::Completed {
                self.publisher.publish(TournamentEvent::EventStepCompleted {
                    event_id: info.event_id.clone(),
                    step_index: index,
                    game_type: info.game_type,
                    winner: info.champion.clone(),
                });
            }
            self.refresh_leaderboard();
            self.publisher
                .publish(TournamentEvent::TournamentProgressUpdated {
                    snapshot: self.dashboard_state(),
                });
        }

        let cancelled = self.cancel.is_cancelled();
        let snapshot = {
            let mut state = self.state.lock().expect("poisoned");
            let standings = leaderboard_of(&state.engines);
            let champion = if cancelled {
                None
            } else {
                standings.first().map(|s| s.team_name.clone())
            };
            state.series_standings = standings;
            state.series_champion = champion;
            state.end_utc = Some(OffsetDateTime::now_utc());
            snapshot_of(&state, &self.config)
        };

        if let Some(champion) = &snapshot.series_champion {
            info!("series champion: {champion}");
        }
        self.publisher.publish(TournamentEvent::TournamentCompleted {
            series_id: snapshot.series_id.clone(),
            series_name: snapshot.series_name.clone(),
            series_champion: snapshot.series_champion.clone(),
            leaderboard: snapshot.series_standings.clone(),
        });

        match run_error {
            Some(e) => Err(e),
            None => Ok(snapshot),
        }
    }

    /// Deep snapshot of the whole series, live during a run.
    pub fn dashboard_state(&self) -> SeriesInfo {
        let state = self.state.lock().expect("poisoned");
        snapshot_of(&state, &self.config)
    }

    /// Every recorded match across all events, event order.
    pub fn all_matches(&self) -> Vec<MatchResult> {
        let state = self.state.lock().expect("poisoned");
        state
            .engines
            .iter()
            .flat_map(|engine| engine.tournament_info().match_results)
            .collect()
    }

    /// Per-group standings of each event, keyed by event id.
    pub fn group_standings_by_event(&self) -> HashMap<String, Vec<GroupStandings>> {
        let state = self.state.lock().expect("poisoned");
        state
            .engines
            .iter()
            .map(|engine| {
                let info = engine.tournament_info();
                (info.event_id, info.group_standings)
            })
            .collect()
    }

    fn validate(&self, bots: &[Bot]) -> Result<(), TournamentError> {
        if self.config.game_types.is_empty() {
            return Err(TournamentError::InvalidConfig(
                "a series needs at least one game type".to_string(),
            ));
        }
        if bots.len() < 2 {
            return Err(TournamentError::InvalidConfig(format!(
                "a series needs at least two bots, got {}",
                bots.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for bot in bots {
            if !seen.insert(&bot.team_name) {
                return Err(TournamentError::InvalidConfig(format!(
                    "duplicate team name '{}'",
                    bot.team_name
                )));
            }
        }
        Ok(())
    }

    fn refresh_leaderboard(&self) {
        let mut state = self.state.lock().expect("poisoned");
        let standings = leaderboard_of(&state.engines);
        state.series_standings = standings;
    }
}

/// Cumulative leaderboard over the completed events of the series.
fn leaderboard_of(engines: &[Arc<GroupStageEngine>]) -> Vec<SeriesStanding> {
    let completed: Vec<(HashMap<String, Standing>, Option<String>)> = engines
        .iter()
        .map(|engine| engine.tournament_info())
        .filter(|info| info.state == EventState::Completed)
        .map(|info| {
            let table: HashMap<String, Standing> = info
                .overall_standings
                .iter()
                .map(|s| (s.team_name.clone(), s.clone()))
                .collect();
            (table, info.champion)
        })
        .collect();
    scoring::series_leaderboard(
        completed
            .iter()
            .map(|(table, champion)| (table, champion.as_deref())),
    )
}

fn snapshot_of(state: &SeriesState, config: &SeriesConfig) -> SeriesInfo {
    SeriesInfo {
        series_id: state.series_id.clone(),
        series_name: config.series_name.clone(),
        events: state
            .engines
            .iter()
            .map(|engine| engine.tournament_info())
            .collect(),
        series_standings: state.series_standings.clone(),
        series_champion: state.series_champion.clone(),
        start_utc: state.start_utc,
        end_utc: state.end_utc,
    }
}
