//! Recipient data streaming
//!
//! A [`RecipientDataSource`] reads the recipient table one row at a time and
//! overlays [`DefaultValues`] from the optional default table onto every
//! record.
//!
//! The default table has a header row and at most one value row:
//!
//! ```text
//! date,signature
//! January 2006,The Iris Team
//! ```
//!
//! # Examples
//!
//! ```rust
//! use iris::data::RecipientDataSource;
//!
//! # fn example() -> Result<(), iris::data::DataError> {
//! let defaults = "date\nJanuary 2006\n";
//! let recipients = "name,email\nJack,jack@x.test\n";
//!
//! let mut source =
//!     RecipientDataSource::from_readers(Some(defaults.as_bytes()), recipients.as_bytes())?;
//!
//! let record = source.next_record()?.expect("one record");
//! assert_eq!(record.get("name"), Some("Jack"));
//! assert_eq!(record.get("date"), Some("January 2006"));
//! assert!(source.next_record()?.is_none());
//! # Ok(())
//! # }
//! ```

use csv::{Reader, ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while opening or reading recipient data
#[derive(Debug, Error)]
pub enum DataError {
    /// A table file could not be opened
    #[error("failed to open {kind} table {path}: {source}")]
    Open {
        /// Which table failed (`default` or `recipient`)
        kind: &'static str,
        /// Path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The default table could not be parsed
    #[error("failed to read default table: {0}")]
    DefaultTable(#[source] csv::Error),

    /// The default table has more than a header and one value row
    #[error("default table malformed: expected at most 2 rows, found {0}")]
    DefaultTableMalformed(usize),

    /// The recipient table header row could not be read
    #[error("failed to read headers from recipient table: {0}")]
    Headers(#[source] csv::Error),

    /// The recipient table has no header row
    #[error("failed to read headers from recipient table: table is empty")]
    EmptyHeader,

    /// A recipient row could not be read (I/O fault or column count mismatch)
    #[error("failed to read record from recipient table: {0}")]
    Record(#[source] csv::Error),
}

/// One recipient's data, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecipientRecord(HashMap<String, String>);

impl RecipientRecord {
    /// Build a record from header and value slices of equal length
    fn from_row<'a>(
        headers: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self(
            headers
                .into_iter()
                .zip(values)
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Value for `column`, if present
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Set `column` to `value`, returning the previous value
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(column.into(), value.into())
    }

    /// Number of columns in the record
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill absent or empty columns from `defaults`
    ///
    /// Present, non-empty values are never overridden.
    pub fn apply_defaults(&mut self, defaults: &DefaultValues) {
        for (key, default) in &defaults.0 {
            match self.0.get_mut(key) {
                Some(value) if value.is_empty() => value.clone_from(default),
                Some(_) => {}
                None => {
                    self.0.insert(key.clone(), default.clone());
                }
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RecipientRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Fallback values for columns absent or empty in recipient rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultValues(HashMap<String, String>);

impl DefaultValues {
    /// Parse a default table
    ///
    /// Zero rows or a header-only table yield an empty map.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is not valid CSV or has more than two rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let rows = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader)
            .into_records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(DataError::DefaultTable)?;

        match rows.as_slice() {
            [] | [_] => Ok(Self::default()),
            [headers, values] => Ok(Self(
                headers
                    .iter()
                    .zip(values.iter())
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            )),
            _ => Err(DataError::DefaultTableMalformed(rows.len())),
        }
    }

    /// Default value for `column`, if any
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Number of default columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no defaults
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for DefaultValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Streams recipient records from a delimited table
///
/// The first row of the recipient table is the header. Rows are read lazily,
/// one per [`RecipientDataSource::next_record`] call, into a buffer owned by
/// the source; each returned record owns copies of its values.
pub struct RecipientDataSource<R = File> {
    reader: Reader<R>,
    headers: StringRecord,
    row: StringRecord,
    defaults: DefaultValues,
}

impl RecipientDataSource<File> {
    /// Open the recipient table and the optional default table
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened, the default table is
    /// malformed, or the recipient table has no header row. An absent default
    /// table (`None`) is not an error.
    pub fn open(
        default_table: Option<&Path>,
        recipient_table: &Path,
    ) -> Result<Self, DataError> {
        let defaults = match default_table {
            Some(path) => DefaultValues::from_reader(open_table("default", path)?)?,
            None => DefaultValues::default(),
        };

        let source = Self::with_defaults(defaults, open_table("recipient", recipient_table)?)?;
        debug!(
            path = %recipient_table.display(),
            columns = source.headers.len(),
            defaults = source.defaults.len(),
            "Opened recipient table"
        );
        Ok(source)
    }
}

impl<R: Read> RecipientDataSource<R> {
    /// Build a data source from in-memory or streamed tables
    ///
    /// # Errors
    ///
    /// See [`RecipientDataSource::open`].
    pub fn from_readers<D: Read>(default_table: Option<D>, recipient_table: R) -> Result<Self, DataError> {
        let defaults = default_table
            .map(DefaultValues::from_reader)
            .transpose()?
            .unwrap_or_default();
        Self::with_defaults(defaults, recipient_table)
    }

    /// Build a data source with already parsed defaults
    ///
    /// # Errors
    ///
    /// Returns `DataError::Headers` if the header row cannot be read, or
    /// `DataError::EmptyHeader` if the table has none.
    pub fn with_defaults(defaults: DefaultValues, recipient_table: R) -> Result<Self, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(recipient_table);
        let headers = reader.headers().map_err(DataError::Headers)?.clone();
        if headers.is_empty() {
            return Err(DataError::EmptyHeader);
        }

        Ok(Self {
            reader,
            headers,
            row: StringRecord::new(),
            defaults,
        })
    }

    /// Column names from the header row
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Defaults overlaid onto every record
    #[must_use]
    pub const fn defaults(&self) -> &DefaultValues {
        &self.defaults
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` once the table is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Record` on an I/O fault or a row whose column count
    /// differs from the header.
    pub fn next_record(&mut self) -> Result<Option<RecipientRecord>, DataError> {
        if !self.reader.read_record(&mut self.row).map_err(DataError::Record)? {
            return Ok(None);
        }

        let mut record = RecipientRecord::from_row(&self.headers, &self.row);
        record.apply_defaults(&self.defaults);
        Ok(Some(record))
    }

    /// Release the underlying table
    pub fn close(self) {
        drop(self);
    }
}

impl<R: Read> Iterator for RecipientDataSource<R> {
    type Item = Result<RecipientRecord, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn open_table(kind: &'static str, path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|source| DataError::Open {
        kind,
        path: path.to_path_buf(),
        source,
    })
}
