pub mod coordinator;
pub mod error;
pub mod plan;
pub mod session;
pub mod source;
pub mod summary;
pub mod types;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use crate::config::FetchSettings;
use coordinator::Coordinator;
use error::FetchError;
use source::{MarketSource, NseClient};
use summary::RunSummary;
use types::InstrumentOutcome;

/// Run the fetch command: plan, fan out, write sheets and summary.json.
pub fn run(settings: &FetchSettings) -> Result<RunSummary> {
    println!(
        "Fetching {} history for {} instruments ({} → {}, expiry {}) into {}",
        settings.instrument_type,
        settings.instruments.len(),
        settings.dates.from_param(),
        settings.dates.to_param(),
        settings.dates.expiry_param(),
        settings.output_dir.display()
    );
    match settings.max_concurrency {
        Some(n) => println!("  at most {n} instruments in flight"),
        None => println!("  all instruments in flight at once"),
    }
    println!();

    let rt = tokio::runtime::Runtime::new().context("creating async runtime")?;
    let outcomes = rt.block_on(async {
        let client = Arc::new(NseClient::new(settings.timeout)?);

        let pb = ProgressBar::new(settings.instruments.len() as u64);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("  Fetching [{bar:40}] {pos}/{len} ({eta})")
                .context("progress bar template")?,
        );

        let outcomes = fetch_all_with_progress(settings, client, pb.clone()).await;
        pb.finish_and_clear();
        outcomes
    })?;

    for outcome in &outcomes {
        match outcome {
            InstrumentOutcome::Succeeded {
                instrument,
                rows,
                path,
            } => println!("  OK    {instrument} → {} ({rows} rows)", path.display()),
            InstrumentOutcome::Failed {
                instrument, kind, ..
            } => println!("  FAIL  {instrument} ({kind})"),
        }
    }

    let summary = RunSummary::from_outcomes(settings, &outcomes);
    let summary_path = summary.write(&settings.output_dir)?;
    summary.print();
    println!("Wrote {}", summary_path.display());

    Ok(summary)
}

/// Create the output directory, then fetch every configured instrument
/// through `source`. Only a directory failure aborts; everything else is
/// reported per instrument.
pub async fn fetch_all<S>(settings: &FetchSettings, source: Arc<S>) -> Result<Vec<InstrumentOutcome>>
where
    S: MarketSource + ?Sized + 'static,
{
    fetch_all_with_progress(settings, source, ProgressBar::hidden()).await
}

async fn fetch_all_with_progress<S>(
    settings: &FetchSettings,
    source: Arc<S>,
    pb: ProgressBar,
) -> Result<Vec<InstrumentOutcome>>
where
    S: MarketSource + ?Sized + 'static,
{
    let jobs = plan::build_plan(settings)?;

    std::fs::create_dir_all(&settings.output_dir).map_err(|source| {
        let err = FetchError::Filesystem {
            path: settings.output_dir.clone(),
            source,
        };
        tracing::error!(%err, "cannot prepare output directory");
        err
    })?;

    let coordinator = Coordinator::new(source, settings.max_concurrency).with_progress(pb);
    Ok(coordinator.run(jobs).await)
}
