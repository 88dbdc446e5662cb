//! Dictionary container format detection.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::schema::SourceFormat;

/// Maximum number of bytes inspected when sniffing content.
const SNIFF_BYTES: usize = 1024;

/// Chooses a dictionary parser from a file's extension or leading content.
///
/// Detection never fails: anything unrecognized is treated as CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect the format of a file on disk.
    ///
    /// The extension wins when it is recognized; otherwise up to 1 KB of
    /// content is sniffed. Unreadable files fall back to CSV.
    pub fn detect_path(&self, path: impl AsRef<Path>) -> SourceFormat {
        let path = path.as_ref();

        if let Some(format) = Self::from_extension(path) {
            return format;
        }

        let mut buffer = Vec::with_capacity(SNIFF_BYTES);
        let read = File::open(path).and_then(|file| file.take(SNIFF_BYTES as u64).read_to_end(&mut buffer));
        match read {
            Ok(_) => self.detect_content(&buffer),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "unreadable file, assuming csv");
                SourceFormat::Csv
            }
        }
    }

    /// Detect the format of an in-memory sample with no file name.
    pub fn detect_content(&self, sample: &[u8]) -> SourceFormat {
        let end = sample.len().min(SNIFF_BYTES);
        let text = String::from_utf8_lossy(&sample[..end]);
        let text = text.trim_start_matches('\u{feff}').trim();

        if text.starts_with('<') {
            SourceFormat::Xml
        } else if text.starts_with('{') || text.starts_with('[') {
            SourceFormat::Json
        } else if text.contains(':') && (text.contains("---") || text.contains("fields:")) {
            SourceFormat::Yaml
        } else {
            SourceFormat::Csv
        }
    }

    /// Map a recognized extension (case-insensitive) to a format.
    pub fn from_extension(path: &Path) -> Option<SourceFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "xml" => Some(SourceFormat::Xml),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extension_wins() {
        let detector = FormatDetector::new();
        let mut file = tempfile::Builder::new().suffix(".JSON").tempfile().unwrap();
        write!(file, "<not>xml</not>").unwrap();
        assert_eq!(detector.detect_path(file.path()), SourceFormat::Json);
    }

    #[test]
    fn test_content_sniffing() {
        let detector = FormatDetector::new();
        assert_eq!(detector.detect_content(b"{\"fields\": {}}"), SourceFormat::Json);
        assert_eq!(detector.detect_content(b"  [1, 2]"), SourceFormat::Json);
        assert_eq!(detector.detect_content(b"<?xml version=\"1.0\"?>"), SourceFormat::Xml);
        assert_eq!(detector.detect_content(b"---\nname: x\n"), SourceFormat::Yaml);
        assert_eq!(detector.detect_content(b"fields:\n  age: integer\n"), SourceFormat::Yaml);
        assert_eq!(detector.detect_content(b"name: x\n"), SourceFormat::Csv);
        assert_eq!(detector.detect_content(b"field_name,type\nage,integer"), SourceFormat::Csv);
        assert_eq!(detector.detect_content(b""), SourceFormat::Csv);
    }

    #[test]
    fn test_unknown_extension_sniffs_content() {
        let mut file = tempfile::Builder::new().suffix(".dict").tempfile().unwrap();
        write!(file, "<Dictionary><field name=\"a\"/></Dictionary>").unwrap();
        assert_eq!(FormatDetector::new().detect_path(file.path()), SourceFormat::Xml);
    }

    #[test]
    fn test_missing_file_is_csv() {
        assert_eq!(
            FormatDetector::new().detect_path("/no/such/file"),
            SourceFormat::Csv
        );
    }
}
