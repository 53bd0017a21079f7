//! Resumable, schema-checked CSV sink.
//!
//! [`CsvSink`] buffers rows in memory and appends them to a single CSV file.
//! The column set is fixed at construction; opening a sink over an existing
//! file whose header differs is an error, never a silent coercion. The file's
//! identifier column doubles as the durable record of what a previous run
//! already persisted, which is what makes scrape resumption possible.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur constructing or writing the sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// An existing output file carries a different header than configured.
    #[error("output file {} has columns {found:?}, expected {expected:?}", path.display())]
    SchemaMismatch {
        /// The conflicting file.
        path: PathBuf,
        /// The columns this run was configured with.
        expected: Vec<String>,
        /// The columns found in the file's header row.
        found: Vec<String>,
    },

    /// A row was written without a value for a configured column.
    #[error("row is missing required column {column:?}")]
    MissingColumn {
        /// The absent column name.
        column: String,
    },

    /// An identifier cell in an existing file did not parse as an integer.
    #[error("invalid identifier value {value:?} in {}", path.display())]
    InvalidIdentifier {
        /// The file being read for resume state.
        path: PathBuf,
        /// The offending cell value.
        value: String,
    },

    /// Filesystem failure on the output path.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// CSV-level read or write failure.
    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl SinkError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Buffered, append-only CSV writer with a fixed column set.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
    flush_threshold: usize,
    buffer: Vec<Vec<String>>,
}

impl CsvSink {
    /// Opens a sink at `path` with the given ordered columns.
    ///
    /// When a file already exists at `path`, its header row must match
    /// `columns` exactly (names, order, count).
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::SchemaMismatch`] on a header conflict, or an IO
    /// or CSV error if the existing header cannot be read.
    pub fn create(
        path: impl Into<PathBuf>,
        columns: Vec<String>,
        flush_threshold: usize,
    ) -> Result<Self, SinkError> {
        let path = path.into();
        if path.is_file() {
            let found = read_header(&path)?;
            if found != columns {
                return Err(SinkError::SchemaMismatch {
                    path,
                    expected: columns,
                    found,
                });
            }
            debug!(path = %path.display(), "existing output file header matches");
        }
        Ok(Self {
            path,
            columns,
            flush_threshold: flush_threshold.max(1),
            buffer: Vec::new(),
        })
    }

    /// Returns the output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured columns, in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffers one row; flushes automatically at the configured threshold.
    ///
    /// The row must carry a value for every configured column. Keys outside
    /// the column set are ignored. A failed validation leaves the buffer
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::MissingColumn`] if a configured column is absent,
    /// or any error from the triggered flush.
    pub fn write(&mut self, row: &HashMap<String, String>) -> Result<(), SinkError> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match row.get(column) {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(SinkError::MissingColumn {
                        column: column.clone(),
                    });
                }
            }
        }
        self.buffer.push(values);
        trace!(buffered = self.buffer.len(), "row buffered");
        if self.buffer.len() >= self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Appends all buffered rows to the output file and clears the buffer.
    ///
    /// A no-op when the buffer is empty: no file is created and nothing is
    /// touched on disk. On first write, parent directories are created and a
    /// header row precedes the data. Safe to call any number of times.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the file cannot be created or written;
    /// the buffer is retained so a later flush can retry.
    pub fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let existed = self.path.is_file();
        if !existed {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| SinkError::io(&self.path, e))?;
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::io(&self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !existed {
            writer
                .write_record(&self.columns)
                .map_err(|e| SinkError::csv(&self.path, e))?;
        }
        for row in &self.buffer {
            writer
                .write_record(row)
                .map_err(|e| SinkError::csv(&self.path, e))?;
        }
        writer
            .flush()
            .map_err(|e| SinkError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            rows = self.buffer.len(),
            "flushed buffered rows"
        );
        self.buffer.clear();
        Ok(())
    }

    /// Reads the identifiers already persisted in the output file.
    ///
    /// One-time full read used at startup for resume computation; a missing
    /// file yields the empty set.
    ///
    /// # Errors
    ///
    /// Returns a CSV or IO error if the file cannot be read, or
    /// [`SinkError::InvalidIdentifier`] if an identifier cell is not an
    /// integer.
    pub fn existing_ids(&self, id_column: &str) -> Result<HashSet<u32>, SinkError> {
        if !self.path.is_file() {
            return Ok(HashSet::new());
        }

        let mut reader =
            csv::Reader::from_path(&self.path).map_err(|e| SinkError::csv(&self.path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| SinkError::csv(&self.path, e))?;
        let Some(index) = headers.iter().position(|h| h == id_column) else {
            return Err(SinkError::MissingColumn {
                column: id_column.to_string(),
            });
        };

        let mut ids = HashSet::new();
        for result in reader.records() {
            let record = result.map_err(|e| SinkError::csv(&self.path, e))?;
            let cell = record.get(index).unwrap_or("");
            let id = cell
                .trim()
                .parse::<u32>()
                .map_err(|_| SinkError::InvalidIdentifier {
                    path: self.path.clone(),
                    value: cell.to_string(),
                })?;
            ids.insert(id);
        }
        debug!(count = ids.len(), "read persisted identifiers");
        Ok(ids)
    }
}

fn read_header(path: &Path) -> Result<Vec<String>, SinkError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| SinkError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| SinkError::csv(path, e))?;
    Ok(headers.iter().map(ToString::to_string).collect())
}
