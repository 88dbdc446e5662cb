//! Delimited dataset reader with delimiter sniffing.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{DataTable, SourceMetadata};
use crate::error::{CodebookError, Result};

/// Lines inspected when sniffing the delimiter.
const SNIFF_LINES: usize = 10;

/// Column separators a dataset may use, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Tab,
    Comma,
    Semicolon,
    Pipe,
    Other(u8),
}

impl Layout {
    const CANDIDATES: [Layout; 4] = [Layout::Tab, Layout::Comma, Layout::Semicolon, Layout::Pipe];

    fn from_byte(byte: u8) -> Self {
        match byte {
            b'\t' => Layout::Tab,
            b',' => Layout::Comma,
            b';' => Layout::Semicolon,
            b'|' => Layout::Pipe,
            other => Layout::Other(other),
        }
    }

    fn byte(self) -> u8 {
        match self {
            Layout::Tab => b'\t',
            Layout::Comma => b',',
            Layout::Semicolon => b';',
            Layout::Pipe => b'|',
            Layout::Other(byte) => byte,
        }
    }

    /// Name recorded in [`SourceMetadata::format`].
    fn name(self) -> &'static str {
        match self {
            Layout::Tab => "tsv",
            Layout::Comma => "csv",
            Layout::Semicolon => "csv-semicolon",
            Layout::Pipe => "psv",
            Layout::Other(_) => "delimited",
        }
    }

    /// Separators in `line` outside double quotes.
    fn separators_in(self, line: &str) -> usize {
        let sep = self.byte() as char;
        line.chars()
            .scan(false, |quoted, ch| {
                if ch == '"' {
                    *quoted = !*quoted;
                }
                Some(!*quoted && ch == sep)
            })
            .filter(|hit| *hit)
            .count()
    }

    /// How convincingly the sampled lines split on this separator.
    ///
    /// Lines agreeing with the header's separator count dominate; the raw
    /// count only breaks ties between equally regular candidates.
    fn fitness(self, lines: &[&str]) -> Option<(usize, usize)> {
        let header = self.separators_in(lines[0]);
        if header == 0 {
            return None;
        }
        let agreeing = lines.iter().filter(|line| self.separators_in(line) == header).count();
        Some((agreeing, header))
    }
}

/// Dataset reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Fixed delimiter; sniffed from the content when unset.
    pub delimiter: Option<u8>,
    /// First record holds column names.
    pub has_header: bool,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
    pub quote: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

impl ReaderConfig {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// Reads raw delimited datasets into a [`DataTable`].
#[derive(Debug, Clone, Default)]
pub struct DatasetReader {
    config: ReaderConfig,
}

impl DatasetReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a dataset file, returning its table and provenance.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|source| CodebookError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let layout = self.layout_for(&contents)?;
        let table = self.parse(&contents, layout)?;
        let digest = format!("sha256:{:x}", Sha256::digest(&contents));

        debug!(
            file = %path.display(),
            layout = layout.name(),
            rows = table.row_count(),
            columns = table.column_count(),
            "read dataset"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            digest,
            contents.len() as u64,
            layout.name().to_string(),
            table.row_count(),
            table.column_count(),
        );
        Ok((table, metadata))
    }

    /// Read an in-memory buffer.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<DataTable> {
        let layout = self.layout_for(bytes)?;
        self.parse(bytes, layout)
    }

    fn layout_for(&self, bytes: &[u8]) -> Result<Layout> {
        match self.config.delimiter {
            Some(byte) => Ok(Layout::from_byte(byte)),
            None => sniff_layout(bytes),
        }
    }

    fn parse(&self, bytes: &[u8], layout: Layout) -> Result<DataTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(layout.byte())
            .quote(self.config.quote)
            .has_headers(self.config.has_header)
            .flexible(true)
            .from_reader(bytes);

        let limit = self.config.max_rows.unwrap_or(usize::MAX);
        let records = csv_reader
            .records()
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let headers: Vec<String> = if self.config.has_header {
            csv_reader.headers()?.iter().map(|h| h.trim().to_string()).collect()
        } else {
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            (1..=width).map(|n| format!("column_{}", n)).collect()
        };

        if headers.is_empty() {
            return Err(CodebookError::EmptyData("dataset has no columns".to_string()));
        }
        if records.is_empty() {
            return Err(CodebookError::EmptyData("dataset has no data rows".to_string()));
        }

        // Ragged rows are padded or truncated to the header width.
        let width = headers.len();
        let rows = records
            .iter()
            .map(|record| {
                let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        Ok(DataTable::new(headers, rows, layout.byte()))
    }
}

fn sniff_layout(bytes: &[u8]) -> Result<Layout> {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    if lines.is_empty() {
        return Err(CodebookError::EmptyData("nothing to sniff a delimiter from".to_string()));
    }

    let mut best = (Layout::Comma, (0, 0));
    for layout in Layout::CANDIDATES {
        if let Some(fitness) = layout.fitness(&lines) {
            if fitness > best.1 {
                best = (layout, fitness);
            }
        }
    }
    Ok(best.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(data: &[u8]) -> u8 {
        sniff_layout(data).unwrap().byte()
    }

    #[test]
    fn test_sniffs_common_layouts() {
        assert_eq!(sniff(b"id,age,sex\nP1,40,M\nP2,51,F"), b',');
        assert_eq!(sniff(b"id\tage\tsex\nP1\t40\tM\nP2\t51\tF"), b'\t');
        assert_eq!(sniff(b"id|age\nP1|40"), b'|');
    }

    #[test]
    fn test_quoted_separators_are_ignored() {
        let data = b"site;investigator\n\"Leeds, UK\";\"Okafor, N\"\n\"Lyon, FR\";\"Brun, C\"";
        assert_eq!(sniff(data), b';');
    }

    #[test]
    fn test_single_column_defaults_to_comma() {
        assert_eq!(sniff(b"patient_id\nP1\nP2"), b',');
    }

    #[test]
    fn test_layout_names() {
        assert_eq!(Layout::from_byte(b';').name(), "csv-semicolon");
        assert_eq!(Layout::from_byte(b'#').name(), "delimited");
    }

    #[test]
    fn test_reads_visits() {
        let table = DatasetReader::new()
            .read_bytes(b"subject, visit ,sbp\nS01,baseline,128\nS02,week 4,141")
            .unwrap();

        assert_eq!(table.headers, vec!["subject", "visit", "sbp"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 1), Some("week 4"));
        assert_eq!(table.column_by_name("sbp"), Some(vec!["128", "141"]));
    }

    #[test]
    fn test_ragged_rows_are_squared() {
        let reader = DatasetReader::with_config(ReaderConfig::default().with_delimiter(b','));
        let table = reader.read_bytes(b"a,b,c\n1,2\n3,4,5,6").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert_eq!(table.rows[1], vec!["3", "4", "5"]);
    }

    #[test]
    fn test_headerless_columns_are_numbered() {
        let config = ReaderConfig {
            has_header: false,
            ..ReaderConfig::default()
        };
        let table = DatasetReader::with_config(config).read_bytes(b"1,2\n3,4").unwrap();
        assert_eq!(table.headers, vec!["column_1", "column_2"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_max_rows() {
        let reader = DatasetReader::with_config(ReaderConfig::default().with_max_rows(1));
        let table = reader.read_bytes(b"a,b\n1,2\n3,4\n5,6").unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_header_only_is_empty_data() {
        let result = DatasetReader::new().read_bytes(b"a,b,c\n");
        assert!(matches!(result, Err(CodebookError::EmptyData(_))));
    }
}
