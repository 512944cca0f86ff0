//! Text encodings a handle can speak at its API boundary.
//!
//! The engine itself only ever sees UTF-8. Each [`TextEncoding`] converts
//! caller text into a NUL-terminated UTF-8 buffer on the way in, and engine
//! bytes back into caller text on the way out.

use crate::error::EncodingError;
use std::borrow::{Borrow, Cow};
use std::ffi::CString;
use std::fmt;

/// A database path in the form the engine's open call for that encoding
/// expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePath {
    /// Opened with `sqlite3_open`.
    Utf8(CString),
    /// Opened with `sqlite3_open16`. Always NUL-terminated.
    Utf16(Vec<u16>),
}

/// Conversion strategy between caller text and engine text.
pub trait TextEncoding {
    /// Borrowed caller text (`str`, `[u16]`).
    type Str: ?Sized + fmt::Debug;
    /// Owned caller text, used for row cells and the last-error message.
    type Text: Borrow<Self::Str> + Clone + Default + Ord + fmt::Debug;

    /// Short label used in log records.
    const NAME: &'static str;

    /// Converts caller text into the engine's UTF-8.
    fn encode(text: &Self::Str) -> Result<CString, EncodingError>;

    /// Converts engine bytes into caller text. Bytes that are not UTF-8
    /// are replaced rather than rejected.
    fn decode(raw: &[u8]) -> Self::Text;

    /// Converts a caller path into the form the engine opens.
    fn encode_path(path: &Self::Str) -> Result<EnginePath, EncodingError>;

    /// Lossy rendering for diagnostics.
    fn display(text: &Self::Str) -> Cow<'_, str>;
}

/// Narrow text: `str` in, `String` out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8 {}

/// Wide text: UTF-16 code units in and out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf16 {}

fn nul_free(bytes: Vec<u8>) -> Result<CString, EncodingError> {
    CString::new(bytes).map_err(|e| EncodingError::InteriorNul {
        position: e.nul_position(),
    })
}

impl TextEncoding for Utf8 {
    type Str = str;
    type Text = String;

    const NAME: &'static str = "utf8";

    fn encode(text: &str) -> Result<CString, EncodingError> {
        nul_free(text.as_bytes().to_vec())
    }

    fn decode(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }

    fn encode_path(path: &str) -> Result<EnginePath, EncodingError> {
        Self::encode(path).map(EnginePath::Utf8)
    }

    fn display(text: &str) -> Cow<'_, str> {
        Cow::Borrowed(text)
    }
}

impl TextEncoding for Utf16 {
    type Str = [u16];
    type Text = Vec<u16>;

    const NAME: &'static str = "utf16";

    fn encode(text: &[u16]) -> Result<CString, EncodingError> {
        if text.is_empty() {
            return Ok(CString::default());
        }
        nul_free(narrow_utf16(text)?.into_bytes())
    }

    fn decode(raw: &[u8]) -> Vec<u16> {
        if raw.is_empty() {
            return Vec::new();
        }
        String::from_utf8_lossy(raw).encode_utf16().collect()
    }

    fn encode_path(path: &[u16]) -> Result<EnginePath, EncodingError> {
        // sqlite3_open16 would pair a lone surrogate with its neighbour and
        // open a different file.
        narrow_utf16(path)?;
        let mut terminated = Vec::with_capacity(path.len() + 1);
        terminated.extend_from_slice(path);
        terminated.push(0);
        Ok(EnginePath::Utf16(terminated))
    }

    fn display(text: &[u16]) -> Cow<'_, str> {
        Cow::Owned(String::from_utf16_lossy(text))
    }
}

// Positions count UTF-16 code units.
fn narrow_utf16(text: &[u16]) -> Result<String, EncodingError> {
    let mut narrow = String::with_capacity(text.len());
    let mut position = 0;
    for unit in char::decode_utf16(text.iter().copied()) {
        match unit {
            Ok('\0') => return Err(EncodingError::InteriorNul { position }),
            Ok(ch) => {
                narrow.push(ch);
                position += ch.len_utf16();
            }
            Err(_) => return Err(EncodingError::InvalidUtf16 { position }),
        }
    }
    Ok(narrow)
}

/// Converts `text` to UTF-16 code units.
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Converts UTF-16 code units to a `String`, replacing unpaired surrogates.
pub fn from_wide(text: &[u16]) -> String {
    String::from_utf16_lossy(text)
}
