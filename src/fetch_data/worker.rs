use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::error::FetchError;
use super::source::MarketSource;
use super::types::{FetchJob, InstrumentOutcome};
use crate::data::{FIRST_DATA_ROW, Sheet, SheetError, map_record};

/// Lifecycle of one instrument's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    HandshakeInFlight,
    FetchInFlight,
    Parsing,
    Mapping,
    Writing,
    Done,
    Failed,
}

/// Body of the historical derivatives endpoint.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Vec<Map<String, Value>>,
}

/// Decode a response body into its records, in source order.
pub fn parse_records(body: &[u8]) -> Result<Vec<Map<String, Value>>, FetchError> {
    let resp: HistoryResponse = serde_json::from_slice(body)?;
    Ok(resp.data)
}

/// Drives one instrument from handshake to saved sheet.
pub struct InstrumentWorker<'a, S: MarketSource + ?Sized> {
    job: &'a FetchJob,
    source: &'a S,
    state: WorkerState,
}

impl<'a, S: MarketSource + ?Sized> InstrumentWorker<'a, S> {
    pub fn new(job: &'a FetchJob, source: &'a S) -> Self {
        InstrumentWorker {
            job,
            source,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn advance(&mut self, next: WorkerState) {
        debug!(
            symbol = %self.job.instrument,
            from = ?self.state,
            to = ?next,
            "worker transition"
        );
        self.state = next;
    }

    /// Run to completion. Errors never escape: they become a `Failed` outcome
    /// tagged with the step that was in flight.
    pub async fn run(mut self) -> InstrumentOutcome {
        match self.drive().await {
            Ok(rows) => {
                self.advance(WorkerState::Done);
                InstrumentOutcome::Succeeded {
                    instrument: self.job.instrument.clone(),
                    rows,
                    path: self.job.output_path.clone(),
                }
            }
            Err(e) => {
                let stage = self.state;
                self.advance(WorkerState::Failed);
                InstrumentOutcome::Failed {
                    instrument: self.job.instrument.clone(),
                    stage: Some(stage),
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<usize, FetchError> {
        self.advance(WorkerState::HandshakeInFlight);
        let credential = self.source.handshake(&self.job.reference_url).await?;

        self.advance(WorkerState::FetchInFlight);
        let body = self.source.fetch(&self.job.data_url, &credential).await?;
        drop(credential);

        self.advance(WorkerState::Parsing);
        let records = parse_records(&body)?;

        self.advance(WorkerState::Mapping);
        let mut sheet = Sheet::new();
        let mut row = FIRST_DATA_ROW;
        for record in &records {
            sheet.write_row(row, &map_record(record))?;
            row += 1;
        }

        self.advance(WorkerState::Writing);
        sheet.write_header()?;
        let path = self.job.output_path.clone();
        tokio::task::spawn_blocking(move || sheet.save(&path))
            .await
            .map_err(|e| SheetError::Io(std::io::Error::other(e)))??;

        Ok(records.len())
    }
}
