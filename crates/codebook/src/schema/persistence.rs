//! JSON persistence for dictionaries and reports.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CodebookError, Result};

use super::dictionary::DataDictionary;

/// Pretty-print `value` to `path`, creating missing parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CodebookError::persistence(parent, e))?;
    }

    let mut writer = File::create(path)
        .map(BufWriter::new)
        .map_err(|e| CodebookError::persistence(path, e))?;
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| CodebookError::persistence(path, e))?;
    writer.flush().map_err(|e| CodebookError::persistence(path, e))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| CodebookError::persistence(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CodebookError::persistence(path, e))
}

impl DataDictionary {
    /// Save the dictionary as JSON.
    ///
    /// ```no_run
    /// # use codebook::schema::DataDictionary;
    /// # fn example(dictionary: &DataDictionary) -> codebook::Result<()> {
    /// dictionary.save("trial.dictionary.json")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    /// Load a dictionary written by [`DataDictionary::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}
