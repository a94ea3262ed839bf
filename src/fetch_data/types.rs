use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use serde::Serialize;

use super::error::ErrorKind;
use super::worker::WorkerState;

// ── Instrument ──────────────────────────────────────────────────────

/// An exchange symbol, e.g. `RELIANCE` or `BAJAJ-AUTO`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        Instrument(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Fetch job ───────────────────────────────────────────────────────

/// Everything one worker needs: who, where to handshake, where to fetch,
/// where to write.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub instrument: Instrument,
    /// Quote page hit first to obtain session cookies.
    pub reference_url: Url,
    /// Historical data API query.
    pub data_url: Url,
    /// Destination spreadsheet.
    pub output_path: PathBuf,
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Terminal report of one worker. Exactly one is produced per job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstrumentOutcome {
    Succeeded {
        instrument: Instrument,
        rows: usize,
        path: PathBuf,
    },
    Failed {
        instrument: Instrument,
        /// Step that was in flight; `None` when the task died without reporting.
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<WorkerState>,
        kind: ErrorKind,
        message: String,
    },
}

impl InstrumentOutcome {
    pub fn instrument(&self) -> &Instrument {
        match self {
            InstrumentOutcome::Succeeded { instrument, .. } => instrument,
            InstrumentOutcome::Failed { instrument, .. } => instrument,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InstrumentOutcome::Succeeded { .. })
    }
}
