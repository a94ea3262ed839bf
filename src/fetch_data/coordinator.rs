use std::sync::Arc;

use futures::future::join_all;
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::error::ErrorKind;
use super::source::MarketSource;
use super::types::{FetchJob, InstrumentOutcome};
use super::worker::InstrumentWorker;

/// Fans out one worker per job and collects exactly one outcome per job.
pub struct Coordinator<S: MarketSource + ?Sized> {
    source: Arc<S>,
    limit: Option<Arc<Semaphore>>,
    progress: ProgressBar,
}

impl<S: MarketSource + ?Sized + 'static> Coordinator<S> {
    /// `max_concurrency = None` starts every worker at once.
    pub fn new(source: Arc<S>, max_concurrency: Option<usize>) -> Self {
        Coordinator {
            source,
            limit: max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1)))),
            progress: ProgressBar::hidden(),
        }
    }

    /// Advance `pb` once per finished worker.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    /// Run every job to a terminal outcome. Outcomes come back in job order.
    /// A failing or panicking worker never affects its siblings.
    pub async fn run(&self, jobs: Vec<FetchJob>) -> Vec<InstrumentOutcome> {
        let mut instruments = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            instruments.push(job.instrument.clone());
            let source = self.source.clone();
            let limit = self.limit.clone();
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                // Held for the worker's lifetime; released on drop, even on panic.
                let _permit = match limit {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = InstrumentWorker::new(&job, source.as_ref()).run().await;
                match &outcome {
                    InstrumentOutcome::Succeeded { rows, path, .. } => {
                        info!(symbol = %job.instrument, rows, path = %path.display(), "instrument done");
                    }
                    InstrumentOutcome::Failed { stage, kind, message, .. } => {
                        warn!(symbol = %job.instrument, ?stage, %kind, %message, "instrument failed");
                    }
                }
                progress.inc(1);
                outcome
            }));
        }

        let results = join_all(handles).await;

        instruments
            .into_iter()
            .zip(results)
            .map(|(instrument, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(symbol = %instrument, error = %e, "worker task aborted");
                    self.progress.inc(1);
                    InstrumentOutcome::Failed {
                        instrument,
                        stage: None,
                        kind: ErrorKind::Panic,
                        message: e.to_string(),
                    }
                }
            })
            .collect()
    }
}
