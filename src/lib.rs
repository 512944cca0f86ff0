//! Encoding-aware SQLite handle.
//!
//! # Intention
//!
//! - Own exactly one SQLite connection per handle and release it on drop.
//! - Offer the same create/update/query surface for narrow ([`utf8`]) and
//!   wide ([`utf16`]) text, translating at the engine boundary.
//! - Map engine result codes onto the stable [`ErrorCode`] enum.
//!
//! # Architectural Boundaries
//!
//! - SQL parsing, planning and storage belong to the bundled engine.
//! - No pooling, retries or transactions beyond what a statement implies.
//! - A handle is never used from two threads at once.

mod connection;
pub mod encoding;
pub mod error;
pub mod sqlite;

pub use encoding::{EnginePath, TextEncoding, Utf16, Utf8};
pub use error::{EncodingError, Error, ErrorCode, Result};
pub use sqlite::{DatabaseHandle, ResultSet, Row, SqliteConfig};

/// Narrow text API: statements, paths and results are UTF-8 `String`s.
pub mod utf8 {
    pub type DatabaseHandle = crate::DatabaseHandle<crate::Utf8>;
    pub type Row = crate::Row<String>;
    pub type ResultSet = crate::ResultSet<String>;
    pub type SqliteConfig = crate::SqliteConfig<String>;
}

/// Wide text API: statements, paths and results are UTF-16 code units.
pub mod utf16 {
    pub use crate::encoding::{from_wide, to_wide};

    pub type WideString = Vec<u16>;
    pub type DatabaseHandle = crate::DatabaseHandle<crate::Utf16>;
    pub type Row = crate::Row<WideString>;
    pub type ResultSet = crate::ResultSet<WideString>;
    pub type SqliteConfig = crate::SqliteConfig<WideString>;
}
