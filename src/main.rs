//! t212-export: fetch Trading 212 account state and export trading history.
//!
//! Commands:
//! - `cash`: print the account cash snapshot as JSON
//! - `report`: run a history export and save it as CSV
//! - `sync`: both of the above
//! - `serve`: run the REST API

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use t212_export::{
    Config, CredentialProvider, EnvCredentials, EnvFileCredentials, Environment, Error,
    IsRetryable, Trading212Client,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit status for failures worth retrying later (EX_TEMPFAIL)
const EXIT_TEMPFAIL: u8 = 75;

/// Trading 212 account and history-export client.
#[derive(Parser, Debug)]
#[command(name = "t212-export")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the demo (practice) environment.
    #[arg(long, global = true)]
    demo: bool,

    /// Dotenv file holding T212_API_KEY and T212_API_SECRET.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Read credentials from the process environment instead of a file.
    #[arg(long, global = true, conflicts_with = "env_file")]
    from_env: bool,

    /// Directory reports are written to.
    #[arg(long, global = true)]
    report_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the account cash snapshot.
    Cash,
    /// Export trading history and save it as CSV.
    Report,
    /// Fetch cash, then export trading history.
    Sync,
    /// Run the REST API.
    Serve {
        /// Address to bind, overriding the configuration.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_retryable() {
                ExitCode::from(EXIT_TEMPFAIL)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = build_config(&cli)?;

    let provider: Box<dyn CredentialProvider> = if cli.from_env {
        Box::new(EnvCredentials)
    } else {
        Box::new(EnvFileCredentials::new(&config.credentials.env_file))
    };
    let client = Trading212Client::new(config.clone(), provider.as_ref())?;

    let cancel = CancellationToken::new();
    t212_export::cancel_on_signal(cancel.clone());

    match cli.command {
        Command::Cash => {
            let cash = client.fetch_cash(&cancel).await?;
            println!("{}", serde_json::to_string_pretty(&cash)?);
        }
        Command::Report => print_report(client.download_report(&cancel).await?),
        Command::Sync => {
            let summary = client.sync(&cancel).await?;
            println!("{}", serde_json::to_string_pretty(&summary.cash)?);
            print_report(summary.report);
        }
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            t212_export::api::start_api_server(client, Arc::new(config), cancel).await?;
        }
    }
    Ok(())
}

/// Load the config file (if any) and apply command-line overrides
fn build_config(cli: &Cli) -> Result<Config, Error> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cli.demo {
        config.environment = Environment::Demo;
    }
    if let Some(env_file) = &cli.env_file {
        config.credentials.env_file = env_file.clone();
    }
    if let Some(report_dir) = &cli.report_dir {
        config.storage.report_dir = report_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_report(saved: Option<PathBuf>) {
    match saved {
        Some(path) => println!("Saved {}", path.display()),
        None => println!("No activity in the export window, nothing saved"),
    }
}
