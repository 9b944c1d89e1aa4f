//! SQLite backing store shared by [`crate::SqliteScheduleStore`] and
//! [`crate::SqliteTaskStore`].

pub(crate) mod rows;

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::{FromSqlError, Type};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;

/// Handle to the relational backend. Clones share one connection.
///
/// The connection sits behind a mutex and every operation runs inside its own
/// transaction, so a caller never observes a half-written aggregate.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite database");
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY NOT NULL,
                account_id INTEGER NOT NULL CHECK (account_id >= 1),
                agent_id INTEGER CHECK (agent_id IS NULL OR agent_id >= 0),
                start_time INTEGER NOT NULL,
                end_time INTEGER
            );
            CREATE INDEX IF NOT EXISTS schedules_start_time_idx
                ON schedules (start_time DESC);
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY NOT NULL,
                account_id INTEGER NOT NULL,
                schedule_id TEXT NOT NULL REFERENCES schedules (id) ON DELETE CASCADE,
                type TEXT NOT NULL CHECK (type IN ('break', 'work')),
                start_time INTEGER,
                duration INTEGER CHECK (duration IS NULL OR duration >= 0)
            );
            CREATE INDEX IF NOT EXISTS tasks_schedule_id_idx ON tasks (schedule_id);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Runs `f` in a deferred transaction. Nothing is written, so the
    /// transaction is simply dropped afterwards.
    pub(crate) fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.connection.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        f(&tx)
    }

    /// Runs `f` in an immediate transaction, committing only when it returns `Ok`.
    ///
    /// Any error rolls the whole unit back when the transaction is dropped.
    pub(crate) fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.connection.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

pub(crate) fn timestamp_to_sql(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn timestamp_from_sql(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            Box::new(FromSqlError::OutOfRange(millis)),
        )
    })
}
