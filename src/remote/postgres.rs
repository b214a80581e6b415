//! Postgres bulk export through `COPY ... TO STDOUT`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::{
    BoxError, ExportError, ExportRequest, ExportResult, Exporter, FileFormat, ObjectStore,
};

/// Options passed to `COPY` unless overridden.
pub const DEFAULT_COPY_OPTIONS: &str = "FORMAT CSV, HEADER, DELIMITER ','";

/// A Postgres connection able to stream `COPY ... TO STDOUT` output.
pub trait CopyOutConnection {
    /// Run `statement` and write every chunk of copy data into `sink`.
    /// Returns the number of bytes written.
    fn copy_out(&self, statement: &str, sink: &mut dyn Write) -> Result<u64, BoxError>;
}

/// Exports a query to CSV through a local scratch file, then uploads it.
pub struct PostgresExporter<C> {
    connection: C,
    copy_options: String,
    scratch_dir: Option<PathBuf>,
}

impl<C: CopyOutConnection> PostgresExporter<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            copy_options: DEFAULT_COPY_OPTIONS.to_string(),
            scratch_dir: None,
        }
    }

    /// Override the `COPY` options.
    pub fn with_copy_options(mut self, options: impl Into<String>) -> Self {
        self.copy_options = options.into();
        self
    }

    /// Stage scratch files in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// `COPY (query) TO STDOUT WITH (options)`
    pub fn copy_command(&self, query: &str) -> String {
        format!("COPY ({}) TO STDOUT WITH ({})", query, self.copy_options)
    }
}

impl<C: CopyOutConnection> Exporter for PostgresExporter<C> {
    fn format(&self) -> FileFormat {
        FileFormat::Csv
    }

    fn export(&self, request: &ExportRequest<'_>, store: &dyn ObjectStore) -> ExportResult<()> {
        let scratch = match &self.scratch_dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new()?,
        };

        let written = {
            let file: File = scratch.reopen()?;
            let mut writer = BufWriter::new(file);
            let written = self
                .connection
                .copy_out(&self.copy_command(request.query), &mut writer)
                .map_err(ExportError::Backend)?;
            writer.flush()?;
            written
        };
        tracing::debug!(table = request.table, bytes = written, "copied rows out of postgres");

        store.upload(scratch.path(), request.key)?;
        Ok(())
    }

    /// True when the `COPY` options ask for a header row.
    fn csv_header(&self) -> bool {
        self.copy_options.split(',').any(|option| {
            let mut words = option.split_whitespace().map(str::to_ascii_uppercase);
            words.next().as_deref() == Some("HEADER")
                && !matches!(words.next().as_deref(), Some("FALSE" | "OFF" | "0"))
        })
    }
}
