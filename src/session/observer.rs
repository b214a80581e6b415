//! Progress reporting for sessions.
//!
//! Sessions never log through global state; every event goes to the
//! [`Observer`] handed to the session. [`TracingObserver`] forwards events to
//! `tracing`, which is what most callers want.

use std::time::Duration;

use super::ObjectKind;

/// Something a session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    /// The engine handle was opened.
    EngineOpened,

    /// A table was requested that this session already materialized.
    AlreadyMaterialized { table: &'a str },

    /// A remote export finished.
    RemoteExported {
        table: &'a str,
        uri: &'a str,
        elapsed: Duration,
    },

    /// The staged export file was removed after loading.
    RemoteFileDeleted { table: &'a str, uri: &'a str },

    /// The remote export was empty; an empty table was created instead.
    EmptyRemoteResult { table: &'a str, uri: &'a str },

    /// A table or view now exists locally.
    Materialized { table: &'a str, elapsed: Duration },

    /// An object was dropped.
    Dropped { name: &'a str, kind: ObjectKind },

    /// A materialized table was copied into an export database.
    Copied { table: &'a str, destination: &'a str },

    /// A table was reached again while exporting and skipped.
    AlreadyCopied { table: &'a str },
}

/// Receives session events.
pub trait Observer {
    fn on_event(&self, event: &SessionEvent<'_>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &SessionEvent<'_>) {
        match *event {
            SessionEvent::EngineOpened => tracing::debug!("engine opened"),
            SessionEvent::AlreadyMaterialized { table } => {
                tracing::debug!(table, "already materialized, skipping")
            }
            SessionEvent::RemoteExported {
                table,
                uri,
                elapsed,
            } => tracing::info!(
                table,
                uri,
                elapsed_ms = elapsed.as_millis() as u64,
                "exported remote data"
            ),
            SessionEvent::RemoteFileDeleted { table, uri } => {
                tracing::debug!(table, uri, "deleted staged export")
            }
            SessionEvent::EmptyRemoteResult { table, uri } => tracing::warn!(
                table,
                uri,
                "remote export produced no file, result set was probably empty"
            ),
            SessionEvent::Materialized { table, elapsed } => tracing::info!(
                table,
                elapsed_ms = elapsed.as_millis() as u64,
                "materialized"
            ),
            SessionEvent::Dropped { name, kind } => {
                tracing::info!(name, kind = %kind, "dropped")
            }
            SessionEvent::Copied { table, destination } => {
                tracing::debug!(table, destination, "copied into export database")
            }
            SessionEvent::AlreadyCopied { table } => {
                tracing::debug!(table, "already exported, skipping")
            }
        }
    }
}
