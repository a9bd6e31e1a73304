//! Orchestrator — drives fetch → validate → notify for one run.
//!
//! State machine: `Fetching → Validating → {NotifySuccess | NotifyFailure}
//! → Done`, with `Aborted` reachable from `Fetching` (nothing retrieved
//! after all retries) or whenever there is nothing to validate. Unexpected
//! errors are caught once, in [`execute`], logged with full detail and
//! propagated; the log book is flushed exactly once on every path.

use fundwatch_core::config::RunConfig;
use fundwatch_core::error::Result;
use fundwatch_core::logbook::LogBook;
use fundwatch_mailbox::{Mailbox, fetch_with_retry};
use fundwatch_notify::Notifier;
use fundwatch_quality::{ValidationOutcome, validate};

/// Terminal and intermediate states of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetching,
    Validating,
    NotifySuccess,
    NotifyFailure,
    Done,
    Aborted,
}

/// Top-level entry point: runs the pipeline, logs any unexpected error and
/// flushes the log book before returning.
pub async fn execute(
    config: &RunConfig,
    mailbox: &mut dyn Mailbox,
    notifiers: &[&dyn Notifier],
    log: &LogBook,
) -> Result<RunState> {
    let result = run(config, mailbox, notifiers, log).await;
    if let Err(e) = &result {
        log.error_with_detail("Unexpected failure; run aborted", e);
    }
    if let Err(e) = log.flush() {
        // the run outcome matters more than the log files
        tracing::error!("Failed to flush the log book: {e}");
    }
    result
}

async fn run(
    config: &RunConfig,
    mailbox: &mut dyn Mailbox,
    notifiers: &[&dyn Notifier],
    log: &LogBook,
) -> Result<RunState> {
    log.action("State: FETCHING");
    let retrieved = fetch_with_retry(
        mailbox,
        &config.root_path,
        &config.subject_pattern,
        &config.retry,
        log,
    )
    .await?;
    let Some(retrieved) = retrieved else {
        log.warn("Run aborted: report not retrieved.");
        return Ok(RunState::Aborted);
    };
    log.info(format!("Report in place (from '{}').", retrieved.subject));

    log.action("State: VALIDATING");
    let outcome = validate(&config.root_path, &config.column, config.threshold, log)?;
    let Some(outcome) = outcome else {
        log.warn("Run aborted: nothing to validate.");
        return Ok(RunState::Aborted);
    };

    dispatch(outcome, notifiers, log).await;
    log.action("State: DONE");
    Ok(RunState::Done)
}

/// Pick the notification branch for the verdict and send it through every
/// configured channel. Exactly one of success/failure is dispatched.
pub async fn dispatch(
    outcome: ValidationOutcome,
    notifiers: &[&dyn Notifier],
    log: &LogBook,
) -> RunState {
    match outcome {
        ValidationOutcome::Accepted(dataset) => {
            log.action("State: NOTIFY_SUCCESS");
            log.info(format!(
                "✅ Spreadsheet within the data-quality limit ({} row(s)).",
                dataset.row_count()
            ));
            for notifier in notifiers {
                let delivery = notifier.notify_success(log).await;
                log.info(format!("Channel '{}': {delivery:?}", notifier.name()));
            }
            RunState::NotifySuccess
        }
        ValidationOutcome::Rejected { missing, threshold } => {
            log.action("State: NOTIFY_FAILURE");
            log.warn(format!(
                "🔍 {missing} missing value(s) found, above the limit of {threshold}."
            ));
            for notifier in notifiers {
                let delivery = notifier.notify_failure(missing, threshold, log).await;
                log.info(format!("Channel '{}': {delivery:?}", notifier.name()));
            }
            RunState::NotifyFailure
        }
    }
}
