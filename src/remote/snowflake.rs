//! Snowflake export through `COPY INTO` a storage location.

use super::{BoxError, ExportError, ExportRequest, ExportResult, Exporter, FileFormat, ObjectStore};

/// A warehouse connection able to run one statement.
pub trait WarehouseConnection {
    /// Run `statement`, returning the number of rows it unloaded.
    fn execute(&self, statement: &str) -> Result<u64, BoxError>;
}

/// Unloads a query straight into object storage as a single Parquet file.
pub struct SnowflakeExporter<C> {
    connection: C,
}

impl<C: WarehouseConnection> SnowflakeExporter<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// The `COPY INTO` statement for `query` unloaded to `uri`.
    pub fn copy_into_statement(&self, uri: &str, query: &str, storage_integration: &str) -> String {
        format!(
            "COPY INTO {uri}\n\
             FROM (\n    {query}\n)\n\
             storage_integration={storage_integration}\n\
             FILE_FORMAT = (TYPE = PARQUET)\n\
             HEADER = true\n\
             single=true\n\
             OVERWRITE=true\n\
             max_file_size=4900000000;"
        )
    }
}

impl<C: WarehouseConnection> Exporter for SnowflakeExporter<C> {
    fn format(&self) -> FileFormat {
        FileFormat::Parquet
    }

    fn export(&self, request: &ExportRequest<'_>, store: &dyn ObjectStore) -> ExportResult<()> {
        let uri = store.uri(request.key);
        let statement = self.copy_into_statement(
            &uri,
            request.query,
            &request.settings.storage_integration(),
        );
        let unloaded = self
            .connection
            .execute(&statement)
            .map_err(ExportError::Backend)?;
        tracing::debug!(table = request.table, rows = unloaded, %uri, "unloaded from warehouse");

        // An empty unload writes no file at all.
        if unloaded == 0 {
            return Err(ExportError::EmptyResult {
                table: request.table.to_string(),
            });
        }
        Ok(())
    }
}
