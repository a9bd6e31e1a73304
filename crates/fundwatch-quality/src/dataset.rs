//! In-memory tabular form of a loaded spreadsheet.

use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use fundwatch_core::error::{FundWatchError, Result};

/// A loaded spreadsheet: the first row as headers, the rest as rows of
/// optional cells. `None` is a missing value.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Load the first worksheet of an xlsx/xls file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| FundWatchError::Quality(format!("Open workbook: {e}")))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FundWatchError::Quality("Workbook has no worksheets".into()))?
            .map_err(|e| FundWatchError::Quality(format!("Read worksheet: {e}")))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| cell_to_string(cell).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    /// Position of a column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Count of missing cells in one column, or `None` if the column does
    /// not exist. Rows shorter than the header row count as missing.
    pub fn missing_in_column(&self, name: &str) -> Option<usize> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .filter(|row| row.get(idx).map_or(true, Option::is_none))
                .count(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Empty cells, blank strings and spreadsheet error cells are all missing.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["Fundo".into(), "Retorno".into()],
            vec![
                vec![Some("A".into()), Some("0.5".into())],
                vec![Some("B".into()), None],
                vec![Some("C".into())], // short row
                vec![Some("D".into()), Some("1.2".into())],
            ],
        )
    }

    #[test]
    fn counts_missing_including_short_rows() {
        assert_eq!(sample().missing_in_column("Retorno"), Some(2));
        assert_eq!(sample().missing_in_column("Fundo"), Some(0));
    }

    #[test]
    fn absent_column_is_none_not_zero() {
        assert_eq!(sample().missing_in_column("Volatilidade"), None);
    }
}
