use anyhow::{Context, Result};
use reqwest::Url;

use super::types::{FetchJob, Instrument};
use crate::config::FetchSettings;

/// Spreadsheet extension for per-instrument output.
pub const OUTPUT_EXTENSION: &str = "csv";

/// One job per configured instrument, in configuration order.
pub fn build_plan(settings: &FetchSettings) -> Result<Vec<FetchJob>> {
    settings
        .instruments
        .iter()
        .map(|instrument| build_job(settings, instrument))
        .collect()
}

fn build_job(settings: &FetchSettings, instrument: &Instrument) -> Result<FetchJob> {
    let symbol = instrument.symbol();

    let reference_url = Url::parse_with_params(settings.reference_url.as_str(), &[("symbol", symbol)])
        .with_context(|| format!("building reference URL for {symbol}"))?;

    let data_url = Url::parse_with_params(
        settings.api_url.as_str(),
        &[
            ("from", settings.dates.from_param().as_str()),
            ("to", settings.dates.to_param().as_str()),
            ("expiryDate", settings.dates.expiry_param().as_str()),
            ("instrumentType", settings.instrument_type.as_str()),
            ("symbol", symbol),
        ],
    )
    .with_context(|| format!("building data URL for {symbol}"))?;

    Ok(FetchJob {
        instrument: instrument.clone(),
        reference_url,
        data_url,
        output_path: settings.output_dir.join(format!("{symbol}.{OUTPUT_EXTENSION}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::config::{ConfigFile, FetchOverrides};
    use chrono::NaiveDate;

    fn settings(symbols: &[&str]) -> FetchSettings {
        let cli = FetchOverrides {
            symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
            output_dir: Some("out".into()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        FetchSettings::resolve(ConfigFile::default(), &cli, today).unwrap()
    }

    #[test]
    fn test_one_job_per_instrument_in_order() {
        let jobs = build_plan(&settings(&["TCS", "ACC", "INFY"])).unwrap();
        let names: Vec<&str> = jobs.iter().map(|j| j.instrument.symbol()).collect();
        assert_eq!(names, vec!["TCS", "ACC", "INFY"]);
        assert_eq!(jobs[1].output_path, Path::new("out").join("ACC.csv"));
    }

    #[test]
    fn test_urls_carry_query() {
        let jobs = build_plan(&settings(&["BAJAJ-AUTO"])).unwrap();
        let job = &jobs[0];
        assert_eq!(
            job.reference_url.as_str(),
            "https://www.nseindia.com/get-quotes/derivatives?symbol=BAJAJ-AUTO"
        );
        assert_eq!(
            job.data_url.as_str(),
            "https://www.nseindia.com/api/historical/fo/derivatives\
             ?from=01-06-2021&to=01-07-2021&expiryDate=29-Jul-2021\
             &instrumentType=FUTSTK&symbol=BAJAJ-AUTO"
        );
    }

    #[test]
    fn test_symbol_is_percent_encoded() {
        let jobs = build_plan(&settings(&["M&M"])).unwrap();
        let symbol: Vec<String> = jobs[0]
            .data_url
            .query_pairs()
            .filter(|(k, _)| k == "symbol")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(symbol, vec!["M&M".to_string()]);
        assert!(jobs[0].reference_url.as_str().ends_with("symbol=M%26M"));
    }
}
