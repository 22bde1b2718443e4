//! Append-only per-run journaling of match results.
//!
//! Each run produces one CSV file named `<base>_<run_id>.csv` with a fixed
//! header emitted on first write. A failed append is logged and swallowed:
//! the journal must never corrupt in-memory state or stop a tournament.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::game_interface::GameType;
use crate::match_runner::MatchResult;

/// Sink for `(MatchResult, group label)` tuples, one run at a time.
///
/// `start_run` opens a fresh sink; appends after a new `start_run` go to the
/// new sink. Implementations must serialize concurrent appends.
pub trait MatchJournal: Send + Sync {
    /// Begins a new run. Subsequent appends are journaled under `run_id`.
    fn start_run(&self, run_id: &str, game_type: GameType);

    /// Records one match under the group it was played in.
    fn append(&self, result: &MatchResult, group_label: &str);
}

/// Journal that drops everything.
pub struct NullJournal;

impl MatchJournal for NullJournal {
    fn start_run(&self, _run_id: &str, _game_type: GameType) {}

    fn append(&self, _result: &MatchResult, _group_label: &str) {}
}

const HEADER: &str = "GameType,PlayerA,PlayerB,Group,StartTimeUtc,DurationMs,MatchOutcome,Bot1Score,Bot2Score,WinnerName,SubActsJson";

struct RunSink {
    path: PathBuf,
    file: Option<File>,
}

/// CSV-file journal. One file per run, header on first append.
pub struct CsvJournal {
    base: PathBuf,
    sink: Mutex<Option<RunSink>>,
}

impl CsvJournal {
    /// Journal writing files next to `base`: run `r` lands in
    /// `<base>_<r>.csv`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            sink: Mutex::new(None),
        }
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        let mut name = self
            .base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "matches".to_string());
        name.push('_');
        name.push_str(run_id);
        name.push_str(".csv");
        self.base.with_file_name(name)
    }
}

impl MatchJournal for CsvJournal {
    fn start_run(&self, run_id: &str, game_type: GameType) {
        debug!("journal run {run_id} ({game_type}) -> {}", self.run_path(run_id).display());
        let mut sink = self.sink.lock().expect("poisoned");
        *sink = Some(RunSink {
            path: self.run_path(run_id),
            file: None,
        });
    }

    fn append(&self, result: &MatchResult, group_label: &str) {
        let mut guard = self.sink.lock().expect("poisoned");
        let sink = match guard.as_mut() {
            Some(sink) => sink,
            None => {
                warn!("journal append before start_run, match dropped");
                return;
            }
        };

        if sink.file.is_none() {
            match File::create(&sink.path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{HEADER}") {
                        warn!("journal header write failed: {e}");
                    }
                    sink.file = Some(file);
                }
                Err(e) => {
                    warn!("journal file {} could not be created: {e}", sink.path.display());
                    return;
                }
            }
        }

        let line = format_record(result, group_label);
        if let Some(file) = sink.file.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                warn!("journal append failed: {e}");
            }
        }
    }
}

fn format_record(result: &MatchResult, group_label: &str) -> String {
    let start = result
        .start_utc
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| result.start_utc.unix_timestamp().to_string());
    let duration_ms = result.duration().as_millis();
    let sub_acts = serde_json::to_string(&result.rounds_log).unwrap_or_else(|_| "[]".to_string());
    [
        csv_field(&result.game_type.to_string()),
        csv_field(&result.bot1),
        csv_field(&result.bot2),
        csv_field(group_label),
        csv_field(&start),
        duration_ms.to_string(),
        result.outcome.code().to_string(),
        result.score1.to_string(),
        result.score2.to_string(),
        csv_field(result.winner.as_deref().unwrap_or("")),
        csv_field(&sub_acts),
    ]
    .join(",")
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
