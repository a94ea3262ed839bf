use clap::Parser;
use tracing_subscriber::EnvFilter;

use fno_history::config::{ConfigFile, FetchOverrides, FetchSettings};
use fno_history::{data, fetch_data, schema};

mod cli;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fno_history=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Columns => {
            data::print_columns();
            Ok(())
        }
        cli::Command::Instruments { config } => {
            let file = ConfigFile::load_optional(config.as_deref())?;
            let settings = FetchSettings::resolve(
                file,
                &FetchOverrides::default(),
                chrono::Local::now().date_naive(),
            )?;
            for instrument in &settings.instruments {
                println!("{instrument}");
            }
            eprintln!("{} instruments", settings.instruments.len());
            Ok(())
        }
        cli::Command::Fetch {
            config,
            output_dir,
            days,
            to,
            expiry,
            instrument_type,
            symbols,
            timeout_secs,
            max_concurrency,
            no_strict,
        } => {
            let file = ConfigFile::load_optional(config.as_deref())?;
            let settings = FetchSettings::resolve(
                file,
                &FetchOverrides {
                    output_dir,
                    days,
                    to,
                    expiry,
                    instrument_type,
                    symbols,
                    timeout_secs,
                    max_concurrency,
                    no_strict,
                },
                chrono::Local::now().date_naive(),
            )?;

            let summary = fetch_data::run(&settings)?;
            match summary.exit_code(settings.strict) {
                0 => Ok(()),
                code => std::process::exit(code),
            }
        }
    }
}
