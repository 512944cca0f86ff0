use crate::connection::{ConnectionHandle, RawRow};
use crate::encoding::TextEncoding;
use crate::error::{Error, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ffi::CString;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// One result row: column name to cell text.
///
/// Keys are unique, so a result set with repeated column names (e.g. a
/// join selecting `id` twice) keeps only the first column of that name.
pub type Row<T> = BTreeMap<T, T>;

/// Rows in the order the engine produced them.
pub type ResultSet<T> = Vec<Row<T>>;

/// SQLite handle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig<T> {
    /// Path to the SQLite database file
    pub db_path: T,
    /// How long the engine retries a locked database before reporting
    /// `Busy`. `None` reports it immediately.
    pub busy_timeout: Option<Duration>,
}

impl<T> SqliteConfig<T> {
    /// Create a new SQLite config for the given path
    pub fn new(db_path: impl Into<T>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: None,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}

/// An open SQLite connection speaking the text encoding `E`.
///
/// The connection is owned exclusively by this value and closed when it is
/// dropped, whatever errors happened before. The handle is `Send` but not
/// `Sync`: it can move to another thread, but calls on one handle are
/// never concurrent.
pub struct DatabaseHandle<E: TextEncoding> {
    connection: ConnectionHandle,
    last_error: E::Text,
    _encoding: PhantomData<fn() -> E>,
}

impl<E: TextEncoding> DatabaseHandle<E> {
    /// Opens (creating if missing) the database at `path`.
    ///
    /// Returns `None` if the engine could not open it; no connection
    /// survives a failed open.
    pub fn create(path: &E::Str) -> Option<Self> {
        Self::open(path, None)
    }

    /// Like [`create`](Self::create), applying the settings in `config`.
    pub fn create_with_config(config: &SqliteConfig<E::Text>) -> Option<Self> {
        Self::open(config.db_path.borrow(), config.busy_timeout)
    }

    fn open(path: &E::Str, busy_timeout: Option<Duration>) -> Option<Self> {
        let shown = E::display(path);
        let engine_path = match E::encode_path(path) {
            Ok(engine_path) => engine_path,
            Err(err) => {
                warn!(path = %shown, error = %err, "database path cannot be encoded");
                return None;
            }
        };

        let connection = match ConnectionHandle::open(&engine_path) {
            Ok(connection) => connection,
            Err(rc) => {
                let code = ErrorCode::from_raw(rc);
                warn!(path = %shown, %code, "failed to open database");
                return None;
            }
        };

        if let Some(timeout) = busy_timeout {
            let rc = connection.set_busy_timeout(timeout);
            if rc != ErrorCode::Ok.raw() {
                let code = ErrorCode::from_raw(rc);
                warn!(path = %shown, %code, "failed to set busy timeout");
                return None;
            }
        }

        debug!(path = %shown, encoding = E::NAME, "opened database");
        Some(Self {
            connection,
            last_error: Default::default(),
            _encoding: PhantomData,
        })
    }

    /// Runs `statement` for its side effects and returns the engine's status.
    ///
    /// The engine's diagnostic, or an empty string when there is none,
    /// replaces the previous [`last_error`](Self::last_error).
    pub fn execute_update(&mut self, statement: &E::Str) -> ErrorCode {
        let sql = match self.encode_statement(statement) {
            Ok(sql) => sql,
            Err(err) => {
                self.last_error = E::decode(err.to_string().as_bytes());
                return err.code();
            }
        };

        let outcome = self.connection.exec(&sql);
        self.last_error = E::decode(outcome.message_bytes());
        let code = ErrorCode::from_raw(outcome.code);
        if !code.is_success() {
            let message = E::display(self.last_error.borrow());
            debug!(%code, %message, "update failed");
        }
        code
    }

    /// Like [`execute_update`](Self::execute_update), returning
    /// [`last_change_count`](Self::last_change_count) on success. DDL leaves
    /// the engine's counter untouched, so it reports the preceding write.
    pub fn try_update(&mut self, statement: &E::Str) -> Result<u64> {
        let code = self.execute_update(statement);
        if !code.is_success() {
            return Err(Error::Sqlite {
                code,
                message: E::display(self.last_error.borrow()).into_owned(),
            });
        }
        Ok(self.last_change_count().unwrap_or(0))
    }

    /// Runs `statement` and collects every row it produces.
    ///
    /// Returns `None` if the statement failed; a statement matching nothing
    /// returns an empty set. Does not touch [`last_error`](Self::last_error).
    pub fn execute_query(&self, statement: &E::Str) -> Option<ResultSet<E::Text>> {
        self.try_query(statement).ok()
    }

    /// Like [`execute_query`](Self::execute_query), reporting why a failed
    /// statement failed.
    pub fn try_query(&self, statement: &E::Str) -> Result<ResultSet<E::Text>> {
        let sql = self.encode_statement(statement)?;

        let mut rows = ResultSet::new();
        let mut collect = |raw: RawRow<'_>| {
            let mut row = Row::new();
            for (name, value) in raw.columns() {
                row.entry(E::decode(name)).or_insert_with(|| E::decode(value));
            }
            rows.push(row);
            true
        };
        let outcome = self.connection.exec_with_rows(&sql, &mut collect);

        let code = ErrorCode::from_raw(outcome.code);
        if !code.is_success() {
            let message = String::from_utf8_lossy(outcome.message_bytes()).into_owned();
            debug!(%code, %message, "query failed");
            return Err(Error::Sqlite { code, message });
        }
        trace!(rows = rows.len(), "query completed");
        Ok(rows)
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE on this
    /// handle.
    pub fn last_change_count(&self) -> Option<u64> {
        u64::try_from(self.connection.changes()).ok()
    }

    /// The diagnostic captured by the most recent update, empty if it
    /// succeeded.
    pub fn last_error(&self) -> &E::Str {
        self.last_error.borrow()
    }

    fn encode_statement(&self, statement: &E::Str) -> Result<CString> {
        trace!(statement = %E::display(statement), "executing");
        E::encode(statement).map_err(|err| {
            warn!(error = %err, "statement cannot be encoded");
            Error::from(err)
        })
    }
}

impl<E: TextEncoding> fmt::Debug for DatabaseHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("encoding", &E::NAME)
            .field("connection", &self.connection)
            .field("last_error", &self.last_error)
            .finish()
    }
}
