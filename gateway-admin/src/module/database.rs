//! Database abstraction module for SQLite operations.
//!
//! This module provides a convenient abstraction layer over rusqlite for database
//! operations. It handles connection management, error handling, and provides a
//! fluent query interface.

use rusqlite::{Connection, Result as SqliteResult};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An error from the underlying SQLite database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An error from the file system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when attempting to access a database connection that has not been initialized.
    #[error("Database connection not initialized")]
    NotInitialized,
}

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A thread-safe wrapper around a SQLite connection.
///
/// The underlying connection is wrapped in an `Arc<Mutex<>>` to make it safely
/// shareable between threads, which is particularly useful in concurrent contexts
/// like web servers.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if necessary) the SQLite database at `path`.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let connection = Connection::open(path)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Executes a statement that modifies the database (`INSERT`, `UPDATE`,
    /// `DELETE`, `CREATE TABLE`), returning the number of affected rows.
    pub fn execute<P>(&self, sql: &str, params: P) -> DatabaseResult<usize>
    where
        P: rusqlite::Params,
    {
        let conn = self.connection.lock().map_err(|_| DatabaseError::NotInitialized)?;
        Ok(conn.execute(sql, params)?)
    }

    /// Executes a query and maps every returned row with `f`.
    pub fn query<T, F, P>(&self, sql: &str, params: P, f: F) -> DatabaseResult<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
        P: rusqlite::Params,
    {
        let conn = self.connection.lock().map_err(|_| DatabaseError::NotInitialized)?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, f)?;
        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result?);
        }
        Ok(results)
    }

    /// Executes a query expected to return at most one row.
    pub fn query_one<T, F, P>(&self, sql: &str, params: P, f: F) -> DatabaseResult<Option<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
        P: rusqlite::Params,
    {
        let conn = self.connection.lock().map_err(|_| DatabaseError::NotInitialized)?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query_map(params, f)?;
        match rows.next() {
            Some(row_result) => Ok(Some(row_result?)),
            None => Ok(None),
        }
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T, F>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let mut conn = self.connection.lock().map_err(|_| DatabaseError::NotInitialized)?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}
