//! Input handling: format detection and dataset reading.

mod format;
mod reader;
mod source;

pub use format::FormatDetector;
pub use reader::{DatasetReader, ReaderConfig};
pub use source::{DataTable, SourceMetadata};
