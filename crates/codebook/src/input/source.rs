//! In-memory datasets and the provenance recorded when they are read.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CodebookError, Result};

/// Tokens that stand for a missing cell, compared case-insensitively.
const MISSING_TOKENS: &[&str] = &["na", "n/a", "null", "none", "nil", ".", "-"];

/// Provenance of a dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file: String,
    pub path: PathBuf,
    /// `sha256:` followed by the hex digest of the raw bytes.
    pub hash: String,
    pub size_bytes: u64,
    /// Delimiter layout (`csv`, `tsv`, `csv-semicolon`, `psv`, `delimited`).
    pub format: String,
    pub encoding: String,
    pub row_count: usize,
    pub column_count: usize,
    pub read_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        Self {
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            hash,
            size_bytes,
            format,
            encoding: "utf-8".into(),
            row_count,
            column_count,
            read_at: Utc::now(),
        }
    }
}

/// Named columns over row-major string cells.
///
/// Every row holds exactly `headers.len()` cells; constructors pad or
/// truncate to keep that true.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Separator used when the table is written back out.
    pub delimiter: u8,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self { headers, rows, delimiter }
    }

    /// Comma-separated table from anything string-like.
    pub fn from_rows<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> = row.into_iter().map(Into::into).collect();
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();
        Self::new(headers, rows, b',')
    }

    /// Transpose named columns into a table; short columns get empty cells.
    pub fn from_columns(columns: Vec<(String, Vec<String>)>) -> Self {
        let height = columns.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
        let rows = (0..height)
            .map(|r| {
                columns
                    .iter()
                    .map(|(_, cells)| cells.get(r).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        let headers = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(headers, rows, b',')
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<&str>> {
        self.column_index(name).map(|index| self.column_values(index).collect())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Overwrite one column. Values beyond the last row are dropped.
    pub fn set_column(&mut self, index: usize, values: Vec<String>) {
        for (row, value) in self.rows.iter_mut().zip(values) {
            if let Some(cell) = row.get_mut(index) {
                *cell = value;
            }
        }
    }

    pub fn missing_cells(&self) -> usize {
        self.rows.iter().flatten().filter(|cell| Self::is_null_value(cell)).count()
    }

    /// Write the table to `path`, header first.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_error = |source| CodebookError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(io_error)
    }

    /// Blank cells and conventional missing-value tokens.
    pub fn is_null_value(value: &str) -> bool {
        let value = value.trim();
        value.is_empty() || MISSING_TOKENS.iter().any(|token| value.eq_ignore_ascii_case(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = DataTable::from_rows(["id", "arm"], vec![vec!["S01"], vec!["S02", "placebo"]]);
        assert_eq!(table.get(0, 1), Some(""));
        assert_eq!(table.column_by_name("arm"), Some(vec!["", "placebo"]));
    }

    #[test]
    fn test_from_columns() {
        let table = DataTable::from_columns(vec![
            ("id".to_string(), vec!["S01".to_string(), "S02".to_string()]),
            ("arm".to_string(), vec!["active".to_string()]),
        ]);
        assert_eq!(table.headers, vec!["id", "arm"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 1), Some(""));
    }

    #[test]
    fn test_set_column_and_missing_cells() {
        let mut table = DataTable::from_rows(["a", "b"], vec![vec!["NA", "1"], vec![" ", "-"]]);
        assert_eq!(table.missing_cells(), 3);

        table.set_column(0, vec!["x".to_string(), "y".to_string(), "ignored".to_string()]);
        assert_eq!(table.column_by_name("a"), Some(vec!["x", "y"]));
        assert_eq!(table.missing_cells(), 1);
    }

    #[test]
    fn test_write_csv_keeps_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let mut table = DataTable::from_rows(["id", "note"], vec![vec!["S01", "a, b"]]);
        table.delimiter = b'\t';

        table.write_csv(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\tnote\nS01\ta, b\n");
    }

    #[test]
    fn test_is_null_value() {
        for missing in ["", "   ", "NA", "n/a", "NULL", "None", "nil", ".", " - "] {
            assert!(DataTable::is_null_value(missing), "{missing:?}");
        }
        for present in ["value", "0", "no", "--"] {
            assert!(!DataTable::is_null_value(present), "{present:?}");
        }
    }
}
