//! CSV persistence of comparison records.
//!
//! One row per record, columns in [`ComparisonRecord`] field order, a single
//! header row, `Yes`/`No` for the discrepancy flag and empty fields for
//! absent paths.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use diffduel_core::{ComparisonRecord, DuelError, Result};

/// Column names in output order.
pub const COLUMNS: [&str; 11] = [
    "repository",
    "old_file_path",
    "new_file_path",
    "commit_sha",
    "parent_commit_sha",
    "commit_message",
    "file_type",
    "file_extension",
    "diff_myers",
    "diff_histogram",
    "discrepancy",
];

/// Streaming dataset writer.
///
/// Records can be appended in batches, one per repository, so a long run
/// never holds the whole dataset in memory. The header row is written
/// exactly once, even if no record is ever appended.
///
/// # Examples
///
/// ```
/// use diffduel_compare::dataset::DatasetWriter;
///
/// let mut out = Vec::new();
/// let mut writer = DatasetWriter::from_writer(&mut out);
/// writer.finish().unwrap();
/// drop(writer);
/// assert!(String::from_utf8(out).unwrap().starts_with("repository,old_file_path"));
/// ```
pub struct DatasetWriter<W: Write> {
    inner: csv::Writer<W>,
    header_written: bool,
    written: usize,
}

impl DatasetWriter<File> {
    /// Create (or truncate) the dataset file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> DatasetWriter<W> {
    /// Wrap any writer.
    pub fn from_writer(writer: W) -> Self {
        Self {
            inner: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            header_written: false,
            written: 0,
        }
    }

    fn ensure_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.inner.write_record(COLUMNS)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Append `records` and flush them to the underlying writer.
    pub fn append(&mut self, records: &[ComparisonRecord]) -> Result<()> {
        self.ensure_header()?;
        for record in records {
            self.inner.serialize(record)?;
        }
        self.written += records.len();
        self.inner.flush()?;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write the header if nothing was appended, then flush.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_header()?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Write `records` to `path` in one go.
pub fn write_dataset(path: &Path, records: &[ComparisonRecord]) -> Result<()> {
    let mut writer = DatasetWriter::create(path)?;
    writer.append(records)?;
    writer.finish()
}

/// Read every record from the dataset at `path`.
///
/// A missing file is [`DuelError::FileNotFound`]; a file with no records is
/// [`DuelError::EmptyDataset`].
pub fn read_dataset(path: &Path) -> Result<Vec<ComparisonRecord>> {
    if !path.is_file() {
        return Err(DuelError::FileNotFound(path.to_path_buf()));
    }

    let records = load_records(path)?;
    if records.is_empty() {
        return Err(DuelError::EmptyDataset(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), count = records.len(), "dataset loaded");
    Ok(records)
}

/// Count records without failing on an empty file.
pub fn count_records(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Err(DuelError::FileNotFound(path.to_path_buf()));
    }
    Ok(load_records(path)?.len())
}

fn load_records(path: &Path) -> Result<Vec<ComparisonRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ComparisonRecord>, csv::Error>>()?;
    Ok(records)
}
