//! Owned engine resources.
//!
//! Every pointer the engine hands out is wrapped the moment it is produced
//! and released by `Drop`, so no path through the handle can leak it or
//! free it twice.

use crate::encoding::EnginePath;
use rusqlite::ffi;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::slice;
use std::time::Duration;
use tracing::{debug, warn};

type RowCallback =
    unsafe extern "C" fn(*mut c_void, c_int, *mut *mut c_char, *mut *mut c_char) -> c_int;

/// Sole owner of an open `sqlite3*`. Closed exactly once, on drop.
#[derive(Debug)]
pub(crate) struct ConnectionHandle {
    db: NonNull<ffi::sqlite3>,
}

// The bundled engine is built in serialized threading mode, so the
// connection may be handed to another thread. It is not `Sync`: callers
// serialize access through `&mut`/ownership.
unsafe impl Send for ConnectionHandle {}

impl ConnectionHandle {
    /// Opens `path`, returning the engine's status code on failure. Any
    /// connection the engine allocated for a failed open is closed before
    /// returning.
    pub(crate) fn open(path: &EnginePath) -> Result<Self, c_int> {
        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe {
            match path {
                EnginePath::Utf8(path) => ffi::sqlite3_open(path.as_ptr(), &mut db),
                EnginePath::Utf16(path) => {
                    ffi::sqlite3_open16(path.as_ptr().cast::<c_void>(), &mut db)
                }
            }
        };
        // Take ownership before looking at `rc`: a failed open may still
        // have allocated a connection that has to be closed.
        let owned = NonNull::new(db).map(|db| ConnectionHandle { db });
        match owned {
            Some(conn) if rc == ffi::SQLITE_OK => Ok(conn),
            Some(conn) => {
                drop(conn);
                Err(rc)
            }
            None if rc == ffi::SQLITE_OK => Err(ffi::SQLITE_NOMEM),
            None => Err(rc),
        }
    }

    pub(crate) fn set_busy_timeout(&self, timeout: Duration) -> c_int {
        let millis = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        unsafe { ffi::sqlite3_busy_timeout(self.db.as_ptr(), millis) }
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    pub(crate) fn changes(&self) -> c_int {
        unsafe { ffi::sqlite3_changes(self.db.as_ptr()) }
    }

    /// Runs `sql` for its side effects only.
    pub(crate) fn exec(&self, sql: &CStr) -> ExecOutcome {
        unsafe { self.exec_raw(sql, None, ptr::null_mut()) }
    }

    /// Runs `sql`, calling `visitor` once per result row. Returning `false`
    /// from the visitor aborts the statement.
    pub(crate) fn exec_with_rows<F>(&self, sql: &CStr, visitor: &mut F) -> ExecOutcome
    where
        F: FnMut(RawRow<'_>) -> bool,
    {
        let user_data = (visitor as *mut F).cast::<c_void>();
        unsafe { self.exec_raw(sql, Some(row_trampoline::<F>), user_data) }
    }

    unsafe fn exec_raw(
        &self,
        sql: &CStr,
        callback: Option<RowCallback>,
        user_data: *mut c_void,
    ) -> ExecOutcome {
        let mut errmsg: *mut c_char = ptr::null_mut();
        let code = ffi::sqlite3_exec(
            self.db.as_ptr(),
            sql.as_ptr(),
            callback,
            user_data,
            &mut errmsg,
        );
        ExecOutcome {
            code,
            message: EngineMessage::from_raw(errmsg),
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        // close_v2 never leaves the connection open: with statements still
        // unfinalized it becomes a zombie, freed by the last finalize.
        let rc = unsafe { ffi::sqlite3_close_v2(self.db.as_ptr()) };
        if rc == ffi::SQLITE_OK {
            debug!("closed sqlite connection");
        } else {
            warn!(rc, "sqlite3_close_v2 reported an error");
        }
    }
}

/// Status code plus the diagnostic buffer of one `sqlite3_exec` call.
#[derive(Debug)]
pub(crate) struct ExecOutcome {
    pub(crate) code: c_int,
    pub(crate) message: Option<EngineMessage>,
}

impl ExecOutcome {
    /// The diagnostic bytes, or empty when the engine produced none.
    pub(crate) fn message_bytes(&self) -> &[u8] {
        self.message
            .as_ref()
            .map(|m| m.as_c_str().to_bytes())
            .unwrap_or_default()
    }
}

/// A diagnostic string allocated by the engine, freed with `sqlite3_free`.
#[derive(Debug)]
pub(crate) struct EngineMessage {
    ptr: NonNull<c_char>,
}

impl EngineMessage {
    fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| EngineMessage { ptr })
    }

    pub(crate) fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }
}

impl Drop for EngineMessage {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_free(self.ptr.as_ptr().cast::<c_void>()) }
    }
}

/// One row as the engine passes it to the exec callback. Borrowed from the
/// engine for the duration of the callback only.
pub(crate) struct RawRow<'a> {
    names: &'a [*mut c_char],
    values: Option<&'a [*mut c_char]>,
}

impl<'a> RawRow<'a> {
    unsafe fn new(argc: c_int, values: *mut *mut c_char, names: *mut *mut c_char) -> Self {
        let len = usize::try_from(argc).unwrap_or(0);
        let names = if names.is_null() || len == 0 {
            &[][..]
        } else {
            slice::from_raw_parts(names.cast_const(), len)
        };
        let values = if values.is_null() {
            None
        } else {
            Some(slice::from_raw_parts(values.cast_const(), names.len()))
        };
        RawRow { names, values }
    }

    /// `(name, value)` pairs in column order; null pointers yield empty bytes.
    pub(crate) fn columns(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + '_ {
        self.names.iter().enumerate().map(move |(i, &name)| {
            let value = self.values.map_or(ptr::null_mut(), |values| values[i]);
            unsafe { (engine_bytes(name), engine_bytes(value)) }
        })
    }
}

unsafe fn engine_bytes<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        &[]
    } else {
        CStr::from_ptr(ptr).to_bytes()
    }
}

unsafe extern "C" fn row_trampoline<F>(
    user_data: *mut c_void,
    argc: c_int,
    values: *mut *mut c_char,
    names: *mut *mut c_char,
) -> c_int
where
    F: FnMut(RawRow<'_>) -> bool,
{
    let visitor = &mut *user_data.cast::<F>();
    let row = RawRow::new(argc, values, names);
    // Unwinding into the engine is undefined behaviour; a panicking visitor
    // aborts the statement instead.
    match panic::catch_unwind(AssertUnwindSafe(|| visitor(row))) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => {
            warn!("row visitor panicked, aborting statement");
            1
        }
    }
}
