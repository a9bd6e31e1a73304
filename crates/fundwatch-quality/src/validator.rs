//! Quality validator — newest spreadsheet in a folder against a
//! missing-value threshold.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fundwatch_core::error::Result;
use fundwatch_core::logbook::LogBook;

use crate::dataset::Dataset;

const SPREADSHEET_EXTS: [&str; 2] = ["xlsx", "xls"];

/// The single per-run quality verdict.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// Within the threshold; carries the loaded table.
    Accepted(Dataset),
    /// Missing-value count exceeded the threshold.
    Rejected { missing: usize, threshold: usize },
}

/// Find the most recently modified spreadsheet in `folder`.
pub fn latest_spreadsheet(folder: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        let is_sheet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SPREADSHEET_EXTS.contains(&e.to_lowercase().as_str()));
        if !is_sheet {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Threshold predicate on an already-loaded dataset.
///
/// An absent column is treated as zero missing values. That fallback is kept
/// as specified, but it gets its own distinct error entry so operators can
/// audit every run it fires on.
pub fn evaluate(
    dataset: Dataset,
    column: &str,
    threshold: usize,
    log: &LogBook,
) -> ValidationOutcome {
    let missing = match dataset.missing_in_column(column) {
        Some(count) => count,
        None => {
            log.error(format!(
                "Column '{column}' not found in the spreadsheet; treating missing count as 0. \
                 Audit the source file."
            ));
            0
        }
    };
    log.info(format!(
        "Quality check: {missing} missing value(s) in '{column}' (limit: {threshold})."
    ));
    if missing > threshold {
        ValidationOutcome::Rejected { missing, threshold }
    } else {
        ValidationOutcome::Accepted(dataset)
    }
}

/// Full validation pass over `folder`.
///
/// `Ok(None)` means there was nothing to validate — no spreadsheet present,
/// or the newest one would not load — which is distinct from either verdict.
pub fn validate(
    folder: &Path,
    column: &str,
    threshold: usize,
    log: &LogBook,
) -> Result<Option<ValidationOutcome>> {
    log.action(format!(
        "Looking for the latest spreadsheet in: {}",
        folder.display()
    ));
    let Some(path) = latest_spreadsheet(folder)? else {
        log.warn("No spreadsheet (.xlsx/.xls) found in the folder.");
        return Ok(None);
    };
    log.info(format!(
        "Latest spreadsheet selected: {}",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let dataset = match Dataset::load(&path) {
        Ok(dataset) => dataset,
        Err(e) => {
            log.error_with_detail(
                format!("Failed to read spreadsheet '{}'", path.display()),
                e,
            );
            return Ok(None);
        }
    };
    log.info(format!("Spreadsheet loaded: {} data row(s).", dataset.row_count()));

    Ok(Some(evaluate(dataset, column, threshold, log)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn book(dir: &Path) -> LogBook {
        LogBook::new(dir, "test")
    }

    fn dataset_with_missing(missing: usize, total: usize) -> Dataset {
        let rows = (0..total)
            .map(|i| {
                vec![
                    Some(format!("fund-{i}")),
                    if i < missing { None } else { Some("0.1".into()) },
                ]
            })
            .collect();
        Dataset::new(vec!["Fundo".into(), "Retorno".into()], rows)
    }

    #[test]
    fn rejected_iff_count_exceeds_threshold() {
        let dir = tempdir().unwrap();
        let log = book(dir.path());

        match evaluate(dataset_with_missing(45, 100), "Retorno", 30, &log) {
            ValidationOutcome::Rejected { missing, threshold } => {
                assert_eq!(missing, 45);
                assert_eq!(threshold, 30);
            }
            ValidationOutcome::Accepted(_) => panic!("45 > 30 must reject"),
        }

        match evaluate(dataset_with_missing(5, 100), "Retorno", 30, &log) {
            ValidationOutcome::Accepted(dataset) => assert_eq!(dataset.row_count(), 100),
            ValidationOutcome::Rejected { .. } => panic!("5 <= 30 must accept"),
        }
    }

    #[test]
    fn count_equal_to_threshold_is_accepted() {
        let dir = tempdir().unwrap();
        let log = book(dir.path());
        assert!(matches!(
            evaluate(dataset_with_missing(30, 50), "Retorno", 30, &log),
            ValidationOutcome::Accepted(_)
        ));
    }

    #[test]
    fn absent_column_logs_and_accepts() {
        let dir = tempdir().unwrap();
        let log = book(dir.path());
        let outcome = evaluate(dataset_with_missing(45, 50), "Volatilidade", 30, &log);
        assert!(matches!(outcome, ValidationOutcome::Accepted(_)));
        assert!(
            log.error_entries()
                .iter()
                .any(|e| e.message.contains("Volatilidade"))
        );
    }

    #[test]
    fn latest_spreadsheet_picks_newest_and_skips_other_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("report_20231231.xlsx"), b"old").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a sheet").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(dir.path().join("report_20240101.xlsx"), b"new").unwrap();

        let latest = latest_spreadsheet(dir.path()).unwrap().unwrap();
        assert!(latest.ends_with("report_20240101.xlsx"));
    }

    #[test]
    fn empty_folder_yields_none() {
        let dir = tempdir().unwrap();
        let log = book(dir.path());
        assert!(latest_spreadsheet(dir.path()).unwrap().is_none());
        assert!(validate(dir.path(), "Retorno", 30, &log).unwrap().is_none());
    }

    #[test]
    fn unreadable_spreadsheet_yields_none_with_error_logged() {
        let dir = tempdir().unwrap();
        let log = book(dir.path());
        std::fs::write(dir.path().join("broken.xlsx"), b"definitely not a zip").unwrap();

        let outcome = validate(dir.path(), "Retorno", 30, &log).unwrap();
        assert!(outcome.is_none());
        assert!(!log.error_entries().is_empty());
    }
}
