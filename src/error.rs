//! Status codes and error types for the SQLite handle.

use rusqlite::ffi;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::raw::c_int;
use thiserror::Error;

/// Outcome of a statement as reported by the engine.
///
/// One variant per SQLite primary result code, see
/// <https://www.sqlite.org/rescode.html>. The enum deliberately carries no
/// numeric discriminants: [`ErrorCode::from_raw`] and [`ErrorCode::raw`]
/// are the only bridge to the engine's integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Successful result.
    Ok,
    /// Generic error.
    Error,
    /// Internal logic error in SQLite.
    Internal,
    /// Access permission denied.
    Perm,
    /// Callback routine requested an abort.
    Abort,
    /// The database file is locked.
    Busy,
    /// A table in the database is locked.
    Locked,
    /// A malloc() failed.
    NoMem,
    /// Attempt to write a readonly database.
    ReadOnly,
    /// Operation terminated by sqlite3_interrupt().
    Interrupt,
    /// Some kind of disk I/O error occurred.
    IoErr,
    /// The database disk image is malformed.
    Corrupt,
    /// Unknown opcode in sqlite3_file_control().
    NotFound,
    /// Insertion failed because database is full.
    Full,
    /// Unable to open the database file.
    CantOpen,
    /// Database lock protocol error.
    Protocol,
    /// Internal use only.
    Empty,
    /// The database schema changed.
    Schema,
    /// String or BLOB exceeds size limit.
    TooBig,
    /// Abort due to constraint violation.
    Constraint,
    /// Data type mismatch.
    Mismatch,
    /// Library used incorrectly.
    Misuse,
    /// Uses OS features not supported on host.
    NoLfs,
    /// Authorization denied.
    Auth,
    /// Not used.
    Format,
    /// Parameter index out of range.
    Range,
    /// File opened that is not a database file.
    NotADb,
    /// Notifications from sqlite3_log().
    Notice,
    /// Warnings from sqlite3_log().
    Warning,
    /// sqlite3_step() has another row ready.
    Row,
    /// sqlite3_step() has finished executing.
    Done,
}

impl ErrorCode {
    /// Every variant, in engine order.
    pub const ALL: [ErrorCode; 31] = [
        ErrorCode::Ok,
        ErrorCode::Error,
        ErrorCode::Internal,
        ErrorCode::Perm,
        ErrorCode::Abort,
        ErrorCode::Busy,
        ErrorCode::Locked,
        ErrorCode::NoMem,
        ErrorCode::ReadOnly,
        ErrorCode::Interrupt,
        ErrorCode::IoErr,
        ErrorCode::Corrupt,
        ErrorCode::NotFound,
        ErrorCode::Full,
        ErrorCode::CantOpen,
        ErrorCode::Protocol,
        ErrorCode::Empty,
        ErrorCode::Schema,
        ErrorCode::TooBig,
        ErrorCode::Constraint,
        ErrorCode::Mismatch,
        ErrorCode::Misuse,
        ErrorCode::NoLfs,
        ErrorCode::Auth,
        ErrorCode::Format,
        ErrorCode::Range,
        ErrorCode::NotADb,
        ErrorCode::Notice,
        ErrorCode::Warning,
        ErrorCode::Row,
        ErrorCode::Done,
    ];

    /// Maps an engine result code to its variant.
    ///
    /// Extended result codes are reduced to their primary code first. A
    /// primary code this table does not know is reported as
    /// [`ErrorCode::Error`].
    pub fn from_raw(code: c_int) -> Self {
        match code & 0xff {
            ffi::SQLITE_OK => ErrorCode::Ok,
            ffi::SQLITE_ERROR => ErrorCode::Error,
            ffi::SQLITE_INTERNAL => ErrorCode::Internal,
            ffi::SQLITE_PERM => ErrorCode::Perm,
            ffi::SQLITE_ABORT => ErrorCode::Abort,
            ffi::SQLITE_BUSY => ErrorCode::Busy,
            ffi::SQLITE_LOCKED => ErrorCode::Locked,
            ffi::SQLITE_NOMEM => ErrorCode::NoMem,
            ffi::SQLITE_READONLY => ErrorCode::ReadOnly,
            ffi::SQLITE_INTERRUPT => ErrorCode::Interrupt,
            ffi::SQLITE_IOERR => ErrorCode::IoErr,
            ffi::SQLITE_CORRUPT => ErrorCode::Corrupt,
            ffi::SQLITE_NOTFOUND => ErrorCode::NotFound,
            ffi::SQLITE_FULL => ErrorCode::Full,
            ffi::SQLITE_CANTOPEN => ErrorCode::CantOpen,
            ffi::SQLITE_PROTOCOL => ErrorCode::Protocol,
            ffi::SQLITE_EMPTY => ErrorCode::Empty,
            ffi::SQLITE_SCHEMA => ErrorCode::Schema,
            ffi::SQLITE_TOOBIG => ErrorCode::TooBig,
            ffi::SQLITE_CONSTRAINT => ErrorCode::Constraint,
            ffi::SQLITE_MISMATCH => ErrorCode::Mismatch,
            ffi::SQLITE_MISUSE => ErrorCode::Misuse,
            ffi::SQLITE_NOLFS => ErrorCode::NoLfs,
            ffi::SQLITE_AUTH => ErrorCode::Auth,
            ffi::SQLITE_FORMAT => ErrorCode::Format,
            ffi::SQLITE_RANGE => ErrorCode::Range,
            ffi::SQLITE_NOTADB => ErrorCode::NotADb,
            ffi::SQLITE_NOTICE => ErrorCode::Notice,
            ffi::SQLITE_WARNING => ErrorCode::Warning,
            ffi::SQLITE_ROW => ErrorCode::Row,
            ffi::SQLITE_DONE => ErrorCode::Done,
            _ => ErrorCode::Error,
        }
    }

    /// The engine's primary result code for this variant.
    pub fn raw(self) -> c_int {
        match self {
            ErrorCode::Ok => ffi::SQLITE_OK,
            ErrorCode::Error => ffi::SQLITE_ERROR,
            ErrorCode::Internal => ffi::SQLITE_INTERNAL,
            ErrorCode::Perm => ffi::SQLITE_PERM,
            ErrorCode::Abort => ffi::SQLITE_ABORT,
            ErrorCode::Busy => ffi::SQLITE_BUSY,
            ErrorCode::Locked => ffi::SQLITE_LOCKED,
            ErrorCode::NoMem => ffi::SQLITE_NOMEM,
            ErrorCode::ReadOnly => ffi::SQLITE_READONLY,
            ErrorCode::Interrupt => ffi::SQLITE_INTERRUPT,
            ErrorCode::IoErr => ffi::SQLITE_IOERR,
            ErrorCode::Corrupt => ffi::SQLITE_CORRUPT,
            ErrorCode::NotFound => ffi::SQLITE_NOTFOUND,
            ErrorCode::Full => ffi::SQLITE_FULL,
            ErrorCode::CantOpen => ffi::SQLITE_CANTOPEN,
            ErrorCode::Protocol => ffi::SQLITE_PROTOCOL,
            ErrorCode::Empty => ffi::SQLITE_EMPTY,
            ErrorCode::Schema => ffi::SQLITE_SCHEMA,
            ErrorCode::TooBig => ffi::SQLITE_TOOBIG,
            ErrorCode::Constraint => ffi::SQLITE_CONSTRAINT,
            ErrorCode::Mismatch => ffi::SQLITE_MISMATCH,
            ErrorCode::Misuse => ffi::SQLITE_MISUSE,
            ErrorCode::NoLfs => ffi::SQLITE_NOLFS,
            ErrorCode::Auth => ffi::SQLITE_AUTH,
            ErrorCode::Format => ffi::SQLITE_FORMAT,
            ErrorCode::Range => ffi::SQLITE_RANGE,
            ErrorCode::NotADb => ffi::SQLITE_NOTADB,
            ErrorCode::Notice => ffi::SQLITE_NOTICE,
            ErrorCode::Warning => ffi::SQLITE_WARNING,
            ErrorCode::Row => ffi::SQLITE_ROW,
            ErrorCode::Done => ffi::SQLITE_DONE,
        }
    }

    /// True for the codes that do not signal a failure: `Ok`, `Row` and `Done`.
    pub fn is_success(self) -> bool {
        matches!(self, ErrorCode::Ok | ErrorCode::Row | ErrorCode::Done)
    }

    /// The engine's symbolic name, e.g. `SQLITE_BUSY`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Ok => "SQLITE_OK",
            ErrorCode::Error => "SQLITE_ERROR",
            ErrorCode::Internal => "SQLITE_INTERNAL",
            ErrorCode::Perm => "SQLITE_PERM",
            ErrorCode::Abort => "SQLITE_ABORT",
            ErrorCode::Busy => "SQLITE_BUSY",
            ErrorCode::Locked => "SQLITE_LOCKED",
            ErrorCode::NoMem => "SQLITE_NOMEM",
            ErrorCode::ReadOnly => "SQLITE_READONLY",
            ErrorCode::Interrupt => "SQLITE_INTERRUPT",
            ErrorCode::IoErr => "SQLITE_IOERR",
            ErrorCode::Corrupt => "SQLITE_CORRUPT",
            ErrorCode::NotFound => "SQLITE_NOTFOUND",
            ErrorCode::Full => "SQLITE_FULL",
            ErrorCode::CantOpen => "SQLITE_CANTOPEN",
            ErrorCode::Protocol => "SQLITE_PROTOCOL",
            ErrorCode::Empty => "SQLITE_EMPTY",
            ErrorCode::Schema => "SQLITE_SCHEMA",
            ErrorCode::TooBig => "SQLITE_TOOBIG",
            ErrorCode::Constraint => "SQLITE_CONSTRAINT",
            ErrorCode::Mismatch => "SQLITE_MISMATCH",
            ErrorCode::Misuse => "SQLITE_MISUSE",
            ErrorCode::NoLfs => "SQLITE_NOLFS",
            ErrorCode::Auth => "SQLITE_AUTH",
            ErrorCode::Format => "SQLITE_FORMAT",
            ErrorCode::Range => "SQLITE_RANGE",
            ErrorCode::NotADb => "SQLITE_NOTADB",
            ErrorCode::Notice => "SQLITE_NOTICE",
            ErrorCode::Warning => "SQLITE_WARNING",
            ErrorCode::Row => "SQLITE_ROW",
            ErrorCode::Done => "SQLITE_DONE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text that cannot be handed to the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The engine reads NUL-terminated strings, so an embedded NUL would
    /// silently truncate the statement.
    #[error("text contains a NUL code unit at position {position}")]
    InteriorNul { position: usize },

    /// A wide string held an unpaired surrogate and has no UTF-8 form.
    #[error("text contains an unpaired UTF-16 surrogate at position {position}")]
    InvalidUtf16 { position: usize },
}

/// Errors reported by the `Result` returning handle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The engine rejected the statement.
    #[error("{code}: {message}")]
    Sqlite { code: ErrorCode, message: String },

    /// The statement was never sent because it could not be encoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl Error {
    /// The status code behind this error. Encoding failures report `Misuse`.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Sqlite { code, .. } => *code,
            Error::Encoding(_) => ErrorCode::Misuse,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_round_trip_through_the_table() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_raw(code.raw()), code, "{code}");
        }
    }

    #[test]
    fn table_follows_engine_numbering() {
        assert_eq!(ErrorCode::Ok.raw(), 0);
        assert_eq!(ErrorCode::Busy.raw(), 5);
        assert_eq!(ErrorCode::Constraint.raw(), 19);
        assert_eq!(ErrorCode::Warning.raw(), 28);
        assert_eq!(ErrorCode::Row.raw(), 100);
        assert_eq!(ErrorCode::Done.raw(), 101);
    }

    #[test]
    fn extended_codes_reduce_to_primary() {
        assert_eq!(
            ErrorCode::from_raw(ffi::SQLITE_CONSTRAINT_UNIQUE),
            ErrorCode::Constraint
        );
        assert_eq!(ErrorCode::from_raw(ffi::SQLITE_BUSY_SNAPSHOT), ErrorCode::Busy);
        assert_eq!(ErrorCode::from_raw(ffi::SQLITE_IOERR_READ), ErrorCode::IoErr);
    }

    #[test]
    fn unknown_codes_are_generic_errors() {
        assert_eq!(ErrorCode::from_raw(57), ErrorCode::Error);
        assert_eq!(ErrorCode::from_raw(-1), ErrorCode::Error);
    }

    #[test]
    fn success_sentinels() {
        let successes: Vec<_> = ErrorCode::ALL
            .into_iter()
            .filter(|code| code.is_success())
            .collect();
        assert_eq!(successes, vec![ErrorCode::Ok, ErrorCode::Row, ErrorCode::Done]);
    }

    #[test]
    fn error_display_uses_symbolic_name() {
        let err = Error::Sqlite {
            code: ErrorCode::Busy,
            message: "database is locked".to_string(),
        };
        assert_eq!(err.to_string(), "SQLITE_BUSY: database is locked");
        assert_eq!(err.code(), ErrorCode::Busy);

        let err = Error::from(EncodingError::InteriorNul { position: 3 });
        assert_eq!(err.code(), ErrorCode::Misuse);
    }
}
