//! Drives one event end-to-end: dispatches pending matches through the
//! executor under a parallelism bound and advances stages at each barrier.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use tracing::{debug, instrument, trace, warn};

use crate::bot::Bot;
use crate::cancel::CancelToken;
use crate::configuration::SeriesConfig;
use crate::error::TournamentError;
use crate::game_interface::GameDescriptor;
use crate::group_stage::{EventInfo, EventState, GroupStageEngine, PendingMatch};
use crate::match_runner::{MatchExecutor, MatchResult};

/// Runs an initialized [`GroupStageEngine`] to completion.
///
/// The manager never advances a stage while matches are outstanding: each
/// dispatch call is a barrier, so all of stage N finishes before stage N+1
/// is generated. A cancelled token stops new dispatch, lets in-flight
/// matches finish with error outcomes, records them, and cancels the event.
pub struct EventManager {
    executor: Arc<dyn MatchExecutor>,
    config: SeriesConfig,
    cancel: CancelToken,
}

impl EventManager {
    /// Creates a manager dispatching through `executor`.
    pub fn new(executor: Arc<dyn MatchExecutor>, config: SeriesConfig, cancel: CancelToken) -> Self {
        Self {
            executor,
            config,
            cancel,
        }
    }

    /// Runs the event until it is `Completed` or `Cancelled` and returns the
    /// final snapshot.
    ///
    /// # Errors
    /// `InvalidState` when the engine was never initialized, or on a state
    /// violation reported by the engine mid-run (a programmer error; the
    /// manager does not retry).
    #[instrument(skip_all, fields(event = engine.event_id()))]
    pub fn run(
        &self,
        engine: &GroupStageEngine,
        bots: &[Bot],
    ) -> Result<EventInfo, TournamentError> {
        let roster: HashMap<String, Bot> = bots
            .iter()
            .map(|b| (b.team_name.clone(), b.clone()))
            .collect();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(engine.cancel());
            }
            let info = engine.tournament_info();
            match info.state {
                EventState::Completed | EventState::Cancelled => return Ok(info),
                EventState::NotStarted => {
                    return Err(TournamentError::InvalidState(
                        "event manager started on an uninitialized event".to_string(),
                    ));
                }
                EventState::InProgress => {}
            }

            let pending = engine.next_matches();
            if pending.is_empty() {
                engine.advance_round()?;
                continue;
            }
            self.dispatch(engine, &roster, pending)?;
        }
    }

    /// Executes one stage's pending matches with at most
    /// [`SeriesConfig::effective_parallelism`] in flight, recording each
    /// result as it lands.
    fn dispatch(
        &self,
        engine: &GroupStageEngine,
        roster: &HashMap<String, Bot>,
        pending: Vec<PendingMatch>,
    ) -> Result<(), TournamentError> {
        let parallelism = self.config.effective_parallelism();
        debug!(
            "dispatching {} matches with parallelism {parallelism}",
            pending.len()
        );
        let (tx_result, rx_result) = mpsc::channel::<MatchResult>();
        let mut queue = pending.into_iter();
        let mut in_flight = 0usize;
        let mut launched_any = false;
        let mut first_error: Option<TournamentError> = None;

        loop {
            while in_flight < parallelism && !self.cancel.is_cancelled() {
                let Some(next) = queue.next() else {
                    break;
                };
                if self.launch_match(engine, roster, next, tx_result.clone()) {
                    in_flight += 1;
                    launched_any = true;
                }
            }
            if in_flight == 0 {
                break;
            }

            // A worker always sends exactly one result.
            let result = rx_result.recv().expect("match worker vanished");
            in_flight -= 1;
            match engine.record_match_result(result) {
                Ok(_) => {}
                Err(e) => {
                    warn!("recording failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        if !launched_any && !self.cancel.is_cancelled() {
            return Err(TournamentError::InvalidState(
                "no pending match could be dispatched".to_string(),
            ));
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Spawns one match worker. Returns false (nothing launched, nothing to
    /// reap) when the pair is missing from the roster.
    fn launch_match(
        &self,
        engine: &GroupStageEngine,
        roster: &HashMap<String, Bot>,
        pending: PendingMatch,
        tx_result: mpsc::Sender<MatchResult>,
    ) -> bool {
        // The engine validated the roster at initialization, so both lookups
        // succeed for any pending pair it handed out.
        let (Some(bot1), Some(bot2)) = (
            roster.get(&pending.bot_a).cloned(),
            roster.get(&pending.bot_b).cloned(),
        ) else {
            warn!(
                "pending pair [{} VS {}] missing from the roster",
                pending.bot_a, pending.bot_b
            );
            return false;
        };
        let descriptor = self.descriptor_for(engine, &pending);
        let executor = self.executor.clone();
        let cancel = self.cancel.clone();

        std::thread::spawn(move || {
            trace!(
                "match [{} VS {}] in {}",
                pending.bot_a,
                pending.bot_b,
                pending.group_label
            );
            let result = executor.execute(&bot1, &bot2, &descriptor, &cancel);
            let _ = tx_result.send(result);
        });
        true
    }

    /// Tiebreaker stages may be played under a different game than the
    /// event itself.
    fn descriptor_for(&self, engine: &GroupStageEngine, pending: &PendingMatch) -> GameDescriptor {
        let label = engine
            .match_group_label(&pending.bot_a, &pending.bot_b)
            .unwrap_or_else(|_| pending.group_label.clone());
        let game_type = if label.starts_with("Tiebreaker") {
            self.config.tiebreaker_game_for(engine.game_type())
        } else {
            engine.game_type()
        };
        self.config.descriptor_for(game_type)
    }
}
