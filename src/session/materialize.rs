//! Materialization of a single definition, dispatched by kind.

use std::time::Instant;

use super::observer::{Observer, SessionEvent};
use super::{MaterializationError, RemoteContext};
use crate::engine::Engine;
use crate::remote::{naming, ExportError, ExportRequest, FileFormat};
use crate::schema::{Definition, DefinitionKind, RemoteTable};
use crate::sql::statements;

/// Bring `definition` into existence. Prerequisites must already exist.
pub(super) fn materialize<E: Engine>(
    engine: &E,
    definition: &Definition,
    remote: Option<&RemoteContext>,
    observer: &dyn Observer,
) -> Result<(), MaterializationError> {
    let name = definition.name();
    let started = Instant::now();

    match definition.kind() {
        DefinitionKind::Derived { .. } => {
            engine.execute_batch(&statements::create_table_as(name, definition.query()))?;
        }
        DefinitionKind::View { .. } => {
            engine.execute_batch(&statements::create_view(name, definition.query()))?;
        }
        DefinitionKind::Remote(table) => {
            let remote = remote.ok_or(MaterializationError::NoRemoteContext)?;
            load_remote(engine, definition, table, remote, observer)?;
        }
    }

    observer.on_event(&SessionEvent::Materialized {
        table: name,
        elapsed: started.elapsed(),
    });
    Ok(())
}

/// Export, load, then delete the staged file.
///
/// An empty export, or a missing Parquet file (the warehouse writes none for
/// an empty result), yields an empty table with the declared columns.
fn load_remote<E: Engine>(
    engine: &E,
    definition: &Definition,
    table: &RemoteTable,
    remote: &RemoteContext,
    observer: &dyn Observer,
) -> Result<(), MaterializationError> {
    let name = definition.name();
    let format = table.format();
    let key = naming::export_key(
        remote.export(),
        name,
        table.params(),
        table.instance_id(),
        format,
    )
    .map_err(ExportError::from)?;
    let uri = remote.store().uri(&key);

    let request = ExportRequest {
        table: name,
        query: definition.query(),
        key: &key,
        settings: remote.export(),
    };
    let started = Instant::now();
    match table.exporter().export(&request, remote.store()) {
        Ok(()) => observer.on_event(&SessionEvent::RemoteExported {
            table: name,
            uri: &uri,
            elapsed: started.elapsed(),
        }),
        Err(ExportError::EmptyResult { .. }) => {
            return create_empty(engine, name, table, &uri, observer);
        }
        Err(e) => return Err(e.into()),
    }

    let mut load = String::new();
    if let Some(prelude) = remote.store().load_prelude() {
        load.push_str(prelude);
        load.push(' ');
    }
    load.push_str(&match format {
        FileFormat::Csv => {
            let header = table.exporter().csv_header();
            statements::load_csv(name, &uri, table.columns(), header)
        }
        FileFormat::Parquet => statements::load_parquet(name, &uri),
    });

    match engine.execute_batch(&load) {
        Ok(()) => {}
        Err(e) if format == FileFormat::Parquet && e.is_not_found() => {
            return create_empty(engine, name, table, &uri, observer);
        }
        Err(e) => return Err(e.into()),
    }

    remote.store().delete(&key).map_err(ExportError::from)?;
    observer.on_event(&SessionEvent::RemoteFileDeleted {
        table: name,
        uri: &uri,
    });
    Ok(())
}

fn create_empty<E: Engine>(
    engine: &E,
    name: &str,
    table: &RemoteTable,
    uri: &str,
    observer: &dyn Observer,
) -> Result<(), MaterializationError> {
    observer.on_event(&SessionEvent::EmptyRemoteResult { table: name, uri });
    if table.columns().is_empty() {
        return Err(MaterializationError::NoDeclaredColumns);
    }
    engine.execute_batch(&statements::create_empty_table(name, table.columns()))?;
    Ok(())
}
