//! # FundWatch — daily report pipeline
//!
//! Fetches today's report email attachment, validates the missing-value
//! threshold on one column and notifies stakeholders over email and Teams.
//!
//! Usage:
//!   fundwatch                          # Run with environment config
//!   fundwatch --threshold 10           # Override the quality limit
//!   fundwatch --verbose                # Debug-level console output

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fundwatch_core::config::RunConfig;
use fundwatch_core::logbook::LogBook;
use fundwatch_mailbox::ImapMailbox;
use fundwatch_notify::{EmailNotifier, Notifier, TeamsNotifier};

mod run;

use run::RunState;

#[derive(Parser)]
#[command(
    name = "fundwatch",
    version,
    about = "📊 FundWatch — fetch today's report, check data quality, notify"
)]
struct Cli {
    /// Folder where the report attachment is saved and validated
    #[arg(long)]
    root: Option<PathBuf>,

    /// Subject affix identifying the report email
    #[arg(long)]
    pattern: Option<String>,

    /// Column whose missing values are counted
    #[arg(long)]
    column: Option<String>,

    /// Maximum tolerable count of missing values
    #[arg(long)]
    threshold: Option<usize>,

    /// Fetch attempts before giving up
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Seconds between fetch attempts
    #[arg(long)]
    retry_secs: Option<u64>,

    /// Log book directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, mut config: RunConfig) -> RunConfig {
        if let Some(root) = self.root {
            config.root_path = root;
        }
        if let Some(pattern) = self.pattern {
            config.subject_pattern = pattern;
        }
        if let Some(column) = self.column {
            config.column = column;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(retry_secs) = self.retry_secs {
            config.retry.retry_interval_secs = retry_secs;
        }
        if let Some(log_dir) = self.log_dir {
            config.log.directory = log_dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let verbose = cli.verbose;
    let config = cli.apply(RunConfig::from_env());
    if verbose {
        tracing::debug!(
            "Config: root={}, pattern='{}', column='{}', threshold={}",
            config.root_path.display(),
            config.subject_pattern,
            config.column,
            config.threshold
        );
    }

    let log = LogBook::new(&config.log.directory, &config.log.prefix);
    let mut mailbox = ImapMailbox::new(config.imap.clone());
    let email = EmailNotifier::from_env();
    let teams = TeamsNotifier::from_env();
    let notifiers: Vec<&dyn Notifier> = vec![&email, &teams];

    // `execute` logs unexpected errors with full detail and flushes the log
    // book on every path; a propagated error becomes the non-zero exit.
    let state = run::execute(&config, &mut mailbox, &notifiers, &log).await?;

    match state {
        RunState::Aborted => tracing::warn!("Run aborted; see the log book for details."),
        _ => tracing::info!("Processing finished successfully."),
    }
    Ok(())
}
