//! Tabular export of collected records.

use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::record::Record;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write records as CSV to any writer: a header row, then one row per record
/// in collection order.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(Record::COLUMNS)?;
    for record in records {
        wtr.write_record(record.as_row())?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Create (or truncate) `path` and write every record to it.
///
/// An empty slice still produces a file containing the header row.
pub fn export_csv(path: &Path, records: &[Record]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_records(file, records)?;
    tracing::info!(path = %path.display(), rows = records.len(), "Saved records");
    Ok(())
}
