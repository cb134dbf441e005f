//! Delimited-text staging files

use crate::batch::Batch;
use crate::error::Result;
use csv::{QuoteStyle, WriterBuilder};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Field delimiter of staging files. Free text often carries commas.
pub const FIELD_DELIMITER: u8 = b'|';

/// A batch serialized to a scratch file: UTF-8, a header row, `|` between
/// fields, nulls as empty fields.
///
/// The file is removed when the artifact is dropped, so it never outlives
/// the load that created it, even if that load is abandoned midway.
#[derive(Debug)]
pub struct StagingArtifact {
    file: NamedTempFile,
    rows: usize,
}

impl StagingArtifact {
    /// Serialize `batch` into a new file under `scratch_dir`
    pub fn write(batch: &Batch, scratch_dir: &Path, label: &str) -> Result<Self> {
        std::fs::create_dir_all(scratch_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", label))
            .suffix(".csv")
            .tempfile_in(scratch_dir)?;

        let mut writer = WriterBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .quote_style(QuoteStyle::Necessary)
            .has_headers(false)
            .from_writer(&mut file);

        writer.write_record(batch.column_names())?;
        for row in batch.rows() {
            writer.write_record(row.iter().map(|value| value.to_field()))?;
        }
        writer.into_inner().map_err(|e| e.into_error())?;

        debug!(
            path = %file.path().display(),
            rows = batch.len(),
            "Wrote staging artifact"
        );

        Ok(Self {
            file,
            rows: batch.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Data rows, excluding the header
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Delete the file now, reporting any error
    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}
