use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::error::ErrorKind;
use super::types::{Instrument, InstrumentOutcome};
use super::worker::WorkerState;
use crate::config::FetchSettings;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
pub struct SucceededEntry {
    pub instrument: Instrument,
    pub rows: usize,
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct FailedEntry {
    pub instrument: Instrument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<WorkerState>,
    pub kind: ErrorKind,
    pub message: String,
}

/// What a run fetched and what it did not, written next to the sheets.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub from: String,
    pub to: String,
    pub expiry: String,
    pub instrument_type: String,
    pub succeeded: Vec<SucceededEntry>,
    pub failed: Vec<FailedEntry>,
}

impl RunSummary {
    /// Partition outcomes, each list sorted by symbol.
    pub fn from_outcomes(settings: &FetchSettings, outcomes: &[InstrumentOutcome]) -> Self {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for outcome in outcomes {
            match outcome {
                InstrumentOutcome::Succeeded {
                    instrument,
                    rows,
                    path,
                } => succeeded.push(SucceededEntry {
                    instrument: instrument.clone(),
                    rows: *rows,
                    file: path.clone(),
                }),
                InstrumentOutcome::Failed {
                    instrument,
                    stage,
                    kind,
                    message,
                } => failed.push(FailedEntry {
                    instrument: instrument.clone(),
                    stage: *stage,
                    kind: *kind,
                    message: message.clone(),
                }),
            }
        }
        succeeded.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        failed.sort_by(|a, b| a.instrument.cmp(&b.instrument));

        RunSummary {
            generated_at: chrono::Utc::now().to_rfc3339(),
            from: settings.dates.from_param(),
            to: settings.dates.to_param(),
            expiry: settings.dates.expiry_param(),
            instrument_type: settings.instrument_type.clone(),
            succeeded,
            failed,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Process exit status: 1 when strict and anything failed, else 0.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if strict && self.has_failures() { 1 } else { 0 }
    }

    pub fn total_rows(&self) -> usize {
        self.succeeded.iter().map(|s| s.rows).sum()
    }

    /// Write `summary.json` into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn print(&self) {
        if !self.failed.is_empty() {
            println!("\nFailed instruments:");
            for f in &self.failed {
                match f.stage {
                    Some(stage) => {
                        println!("  {} [{} during {:?}] {}", f.instrument, f.kind, stage, f.message)
                    }
                    None => println!("  {} [{}] {}", f.instrument, f.kind, f.message),
                }
            }
        }
        println!(
            "\nDone: {} succeeded ({} rows), {} failed.",
            self.succeeded.len(),
            self.total_rows(),
            self.failed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, FetchOverrides};
    use chrono::NaiveDate;

    fn settings() -> FetchSettings {
        let today = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        FetchSettings::resolve(ConfigFile::default(), &FetchOverrides::default(), today).unwrap()
    }

    fn outcomes() -> Vec<InstrumentOutcome> {
        vec![
            InstrumentOutcome::Succeeded {
                instrument: Instrument::new("TCS"),
                rows: 20,
                path: "out/TCS.csv".into(),
            },
            InstrumentOutcome::Failed {
                instrument: Instrument::new("BEL"),
                stage: Some(WorkerState::FetchInFlight),
                kind: ErrorKind::Transport,
                message: "timed out".into(),
            },
            InstrumentOutcome::Succeeded {
                instrument: Instrument::new("ACC"),
                rows: 21,
                path: "out/ACC.csv".into(),
            },
        ]
    }

    #[test]
    fn test_partitions_and_sorts() {
        let summary = RunSummary::from_outcomes(&settings(), &outcomes());
        let ok: Vec<&str> = summary.succeeded.iter().map(|s| s.instrument.symbol()).collect();
        assert_eq!(ok, vec!["ACC", "TCS"]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.has_failures());
        assert_eq!(summary.total_rows(), 41);
        assert_eq!(summary.from, "01-06-2021");
        assert_eq!(summary.expiry, "29-Jul-2021");
    }

    #[test]
    fn test_written_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunSummary::from_outcomes(&settings(), &outcomes());
        let path = summary.write(dir.path()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["instrument_type"], "FUTSTK");
        assert_eq!(json["succeeded"][0]["instrument"], "ACC");
        assert_eq!(json["failed"][0]["instrument"], "BEL");
        assert_eq!(json["failed"][0]["stage"], "fetch_in_flight");
        assert_eq!(json["failed"][0]["kind"], "transport");
    }

    #[test]
    fn test_no_failures() {
        let summary = RunSummary::from_outcomes(&settings(), &outcomes()[..1]);
        assert!(!summary.has_failures());
        assert_eq!(summary.exit_code(true), 0);
        assert_eq!(summary.exit_code(false), 0);
    }

    #[test]
    fn test_exit_code_follows_strictness() {
        let summary = RunSummary::from_outcomes(&settings(), &outcomes());
        assert_eq!(summary.exit_code(true), 1);
        assert_eq!(summary.exit_code(false), 0);

        let lenient = FetchOverrides {
            no_strict: true,
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        let lenient = FetchSettings::resolve(ConfigFile::default(), &lenient, today).unwrap();
        assert_eq!(summary.exit_code(settings().strict), 1);
        assert_eq!(summary.exit_code(lenient.strict), 0);
    }
}
