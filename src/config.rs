use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, TimeDelta};
use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fetch_data::types::Instrument;
use crate::universe::DEFAULT_INSTRUMENTS;

pub const DEFAULT_REFERENCE_URL: &str = "https://www.nseindia.com/get-quotes/derivatives";
pub const DEFAULT_API_URL: &str = "https://www.nseindia.com/api/historical/fo/derivatives";
pub const DEFAULT_INSTRUMENT_TYPE: &str = "FUTSTK";
pub const DEFAULT_EXPIRY: &str = "29-Jul-2021";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "spreadsheets";

/// `from` / `to` query format, e.g. `01-07-2021`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// `expiryDate` query format, e.g. `29-Jul-2021`.
pub const EXPIRY_FORMAT: &str = "%d-%b-%Y";

// ── Config file ─────────────────────────────────────────────────────

/// Optional JSON config file. Every field may be omitted; CLI flags take
/// precedence over values set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Symbols to fetch. Defaults to the built-in F&O stock universe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruments: Option<Vec<String>>,
    /// Quote page used for the cookie handshake; `?symbol=` is appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    /// Historical derivatives API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// `instrumentType` query value, e.g. `FUTSTK` or `FUTIDX`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<String>,
    /// Contract expiry as `dd-Mon-yyyy`, e.g. `29-Jul-2021`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Days of history ending at `to` (today by default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<u32>,
    /// Per-request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Upper bound on instruments in flight at once. Unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Directory that receives one spreadsheet per instrument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` if given, otherwise start from defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

// ── CLI overrides ───────────────────────────────────────────────────

/// Values supplied on the command line for the `fetch` command.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub output_dir: Option<PathBuf>,
    pub days: Option<u32>,
    /// End date as `dd-mm-yyyy`.
    pub to: Option<String>,
    pub expiry: Option<String>,
    pub instrument_type: Option<String>,
    pub symbols: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    /// Exit 0 even when some instruments failed.
    pub no_strict: bool,
}

// ── Resolved settings ───────────────────────────────────────────────

/// Query window shared read-only by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub expiry: NaiveDate,
}

impl DateRange {
    /// Window of `lookback_days` ending at `to`, or `None` when the start
    /// falls outside the representable calendar.
    pub fn ending(to: NaiveDate, lookback_days: u32, expiry: NaiveDate) -> Option<Self> {
        let back = TimeDelta::try_days(i64::from(lookback_days))?;
        let from = to.checked_sub_signed(back)?;
        Some(DateRange { from, to, expiry })
    }

    pub fn from_param(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }

    pub fn expiry_param(&self) -> String {
        self.expiry.format(EXPIRY_FORMAT).to_string()
    }
}

/// Fully resolved configuration, built once at start-up.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub instruments: Vec<Instrument>,
    pub dates: DateRange,
    pub reference_url: Url,
    pub api_url: Url,
    pub instrument_type: String,
    pub timeout: Duration,
    pub max_concurrency: Option<usize>,
    pub output_dir: PathBuf,
    /// Exit non-zero if any instrument failed.
    pub strict: bool,
}

impl FetchSettings {
    /// Merge CLI overrides over the config file over built-in defaults.
    /// `today` is the default end of the date window.
    pub fn resolve(file: ConfigFile, cli: &FetchOverrides, today: NaiveDate) -> Result<Self> {
        let symbols: Vec<String> = match (&cli.symbols, file.instruments) {
            (Some(s), _) => s.clone(),
            (None, Some(s)) => s,
            (None, None) => DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        };
        let instruments = normalize_instruments(&symbols)?;

        let to = match &cli.to {
            Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .with_context(|| format!("invalid --to date '{s}', expected dd-mm-yyyy"))?,
            None => today,
        };
        let expiry_str = cli
            .expiry
            .clone()
            .or(file.expiry)
            .unwrap_or_else(|| DEFAULT_EXPIRY.to_string());
        let expiry = NaiveDate::parse_from_str(&expiry_str, EXPIRY_FORMAT)
            .with_context(|| format!("invalid expiry '{expiry_str}', expected dd-Mon-yyyy"))?;
        let days = cli
            .days
            .or(file.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS);
        let Some(dates) = DateRange::ending(to, days, expiry) else {
            bail!("lookback of {days} days is out of range");
        };

        let reference_url = parse_url(
            file.reference_url.as_deref().unwrap_or(DEFAULT_REFERENCE_URL),
            "reference_url",
        )?;
        let api_url = parse_url(file.api_url.as_deref().unwrap_or(DEFAULT_API_URL), "api_url")?;

        let instrument_type = cli
            .instrument_type
            .clone()
            .or(file.instrument_type)
            .unwrap_or_else(|| DEFAULT_INSTRUMENT_TYPE.to_string());
        if instrument_type.trim().is_empty() {
            bail!("instrument type must not be empty");
        }

        let timeout_secs = cli
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("timeout must be at least 1 second");
        }

        let max_concurrency = cli.max_concurrency.or(file.max_concurrency);
        if max_concurrency == Some(0) {
            bail!("max concurrency must be at least 1");
        }

        let output_dir = cli
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(FetchSettings {
            instruments,
            dates,
            reference_url,
            api_url,
            instrument_type: instrument_type.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
            max_concurrency,
            output_dir,
            strict: !cli.no_strict,
        })
    }
}

fn parse_url(raw: &str, field: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid {field} '{raw}'"))
}

/// Trim, upper-case and de-duplicate symbols, keeping first-seen order.
/// Symbols become file names, so path separators and `..` are rejected.
pub fn normalize_instruments(symbols: &[String]) -> Result<Vec<Instrument>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in symbols {
        let sym = raw.trim().to_uppercase();
        if sym.is_empty() {
            continue;
        }
        if sym.contains('/') || sym.contains('\\') || sym.contains("..") {
            bail!("invalid symbol '{raw}'");
        }
        if seen.insert(sym.clone()) {
            out.push(Instrument::new(sym));
        }
    }
    if out.is_empty() {
        bail!("no instruments configured");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 7, 15).unwrap()
    }


    #[test]
    fn test_defaults() {
        let s = FetchSettings::resolve(ConfigFile::default(), &FetchOverrides::default(), today()).unwrap();
        assert_eq!(s.instruments.len(), DEFAULT_INSTRUMENTS.len());
        assert_eq!(s.instruments[0].symbol(), "AARTIIND");
        assert_eq!(s.dates.to_param(), "15-07-2021");
        assert_eq!(s.dates.from_param(), "15-06-2021");
        assert_eq!(s.dates.expiry_param(), "29-Jul-2021");
        assert_eq!(s.instrument_type, "FUTSTK");
        assert_eq!(s.timeout, Duration::from_secs(10));
        assert_eq!(s.max_concurrency, None);
        assert_eq!(s.output_dir, PathBuf::from("spreadsheets"));
        assert_eq!(s.reference_url.as_str(), DEFAULT_REFERENCE_URL);
        assert!(s.strict);
    }

    #[test]
    fn test_cli_beats_file_beats_default() {
        let file = ConfigFile {
            instruments: Some(vec!["infy".into(), "TCS".into()]),
            expiry: Some("26-Aug-2021".into()),
            lookback_days: Some(10),
            max_concurrency: Some(8),
            output_dir: Some("from-file".into()),
            ..Default::default()
        };
        let cli = FetchOverrides {
            symbols: Some(vec!["sbin".into()]),
            days: Some(5),
            to: Some("02-08-2021".into()),
            output_dir: Some("from-cli".into()),
            no_strict: true,
            ..Default::default()
        };
        let s = FetchSettings::resolve(file, &cli, today()).unwrap();
        assert_eq!(s.instruments, vec![Instrument::new("SBIN")]);
        assert_eq!(s.dates.from_param(), "28-07-2021");
        assert_eq!(s.dates.to_param(), "02-08-2021");
        assert_eq!(s.dates.expiry_param(), "26-Aug-2021");
        assert_eq!(s.max_concurrency, Some(8));
        assert_eq!(s.output_dir, PathBuf::from("from-cli"));
        assert!(!s.strict);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_expiry = FetchOverrides {
            expiry: Some("2021-07-29".into()),
            ..Default::default()
        };
        assert!(FetchSettings::resolve(ConfigFile::default(), &bad_expiry, today()).is_err());

        let zero_pool = FetchOverrides {
            max_concurrency: Some(0),
            ..Default::default()
        };
        assert!(FetchSettings::resolve(ConfigFile::default(), &zero_pool, today()).is_err());

        let bad_url = ConfigFile {
            api_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(FetchSettings::resolve(bad_url, &FetchOverrides::default(), today()).is_err());

        let huge_lookback = FetchOverrides {
            days: Some(u32::MAX),
            ..Default::default()
        };
        let err = FetchSettings::resolve(ConfigFile::default(), &huge_lookback, today()).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let huge_file_lookback = ConfigFile {
            lookback_days: Some(u32::MAX),
            ..Default::default()
        };
        assert!(
            FetchSettings::resolve(huge_file_lookback, &FetchOverrides::default(), today()).is_err()
        );
    }

    #[test]
    fn test_window_ending_checks_range() {
        let expiry = NaiveDate::from_ymd_opt(2021, 7, 29).unwrap();
        let dates = DateRange::ending(today(), 30, expiry).unwrap();
        assert_eq!(dates.from, NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
        assert!(DateRange::ending(NaiveDate::MIN, 1, expiry).is_none());
    }

    #[test]
    fn test_normalize_instruments() {
        let syms: Vec<String> = vec![" acc ".into(), "ACC".into(), "".into(), "Bajaj-Auto".into()];
        let out = normalize_instruments(&syms).unwrap();
        let names: Vec<&str> = out.iter().map(Instrument::symbol).collect();
        assert_eq!(names, vec!["ACC", "BAJAJ-AUTO"]);

        assert!(normalize_instruments(&["../etc".to_string()]).is_err());
        assert!(normalize_instruments(&["a/b".to_string()]).is_err());
        assert!(normalize_instruments(&["  ".to_string()]).is_err());
    }

    #[test]
    fn test_config_file_rejects_unknown_fields() {
        let err = serde_json::from_str::<ConfigFile>(r#"{"instrumnets": ["ACC"]}"#);
        assert!(err.is_err());

        let ok: ConfigFile =
            serde_json::from_str(r#"{"instruments": ["ACC"], "timeout_secs": 5}"#).unwrap();
        assert_eq!(ok.timeout_secs, Some(5));
        assert_eq!(ok.api_url, None);
    }
}
