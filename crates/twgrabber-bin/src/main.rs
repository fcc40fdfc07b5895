//! twgrabber - capture a keyword-filtered stream to a file.

mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command, CommandFactory, FromArgMatches, Parser};

/// Capture every record matching the keywords to a file until interrupted.
#[derive(Parser, Debug)]
#[command(name = "twgrabber")]
#[command(version)]
pub(crate) struct Cli {
    /// Comma-separated keywords to track, e.g. "rust,tokio"
    pub keywords: String,

    /// Output file; created or truncated
    pub file: PathBuf,

    /// Credential file with consumer_key, consumer_secret, access_token, access_token_secret
    #[arg(short, long, default_value = "credentials.txt")]
    pub credentials: PathBuf,

    /// Directory holding config.json and logs. Defaults to ~/.twgrabber
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config.json
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Give up after this many consecutive reconnect attempts. Unlimited by default
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl Cli {
    /// The derived command with `-v` as the short version flag.
    fn command_with_short_version() -> Command {
        Cli::command().disable_version_flag(true).arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
    }

    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command_with_short_version().try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_args() -> Self {
        Self::try_parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match app::run(cli).await {
        Ok(report) => {
            tracing::info!(
                records = report.records,
                bytes = report.bytes,
                reconnects = report.reconnects,
                "twgrabber exiting"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("twgrabber: {failure}");
            ExitCode::FAILURE
        }
    }
}
