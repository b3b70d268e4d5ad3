//! Owned prepared statement handle.

use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

use libsqlite3_sys as ffi;
use tracing::{debug, warn};

use crate::status::{self, check};
use crate::{Error, Result};

/// A compiled statement owned by the statement cache.
///
/// The handle is finalized exactly once: either explicitly through
/// [`PreparedStatement::finalize`] or when the value is dropped.
#[derive(Debug)]
pub(crate) struct PreparedStatement {
   raw: NonNull<ffi::sqlite3_stmt>,
}

impl PreparedStatement {
   /// Compiles the first statement in `sql`.
   ///
   /// Returns `None` when `sql` holds no statement at all (empty, whitespace or
   /// comments only).
   pub(crate) fn prepare(db: *mut ffi::sqlite3, sql: &str) -> Result<Option<Self>> {
      let len = c_int::try_from(sql.len()).map_err(|_| Error::Sqlite {
         code: ffi::SQLITE_TOOBIG,
         message: "SQL text too long".into(),
      })?;
      let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();
      let mut tail: *const c_char = ptr::null();

      // SAFETY: db is a live handle, sql is valid for len bytes.
      let code = unsafe {
         ffi::sqlite3_prepare_v2(db, sql.as_ptr().cast(), len, &mut raw, &mut tail)
      };
      check(code, db)?;

      if !tail.is_null() {
         let consumed = tail as usize - sql.as_ptr() as usize;
         if let Some(rest) = sql.get(consumed..)
            && !rest.trim().is_empty()
         {
            debug!(rest = %rest.trim(), "Ignoring SQL after the first statement");
         }
      }

      Ok(NonNull::new(raw).map(|raw| Self { raw }))
   }

   pub(crate) fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
      self.raw.as_ptr()
   }

   /// The connection this statement was compiled against.
   pub(crate) fn db(&self) -> *mut ffi::sqlite3 {
      // SAFETY: raw is a live statement.
      unsafe { ffi::sqlite3_db_handle(self.as_ptr()) }
   }

   /// Advances the cursor, returning the raw step code.
   pub(crate) fn step(&mut self) -> c_int {
      // SAFETY: raw is a live statement.
      unsafe { ffi::sqlite3_step(self.as_ptr()) }
   }

   /// Rewinds the cursor so the statement can run again. Bindings are kept.
   pub(crate) fn reset(&mut self) -> Result<()> {
      // SAFETY: raw is a live statement.
      let code = unsafe { ffi::sqlite3_reset(self.as_ptr()) };
      check(code, self.db())
   }

   /// Sets every parameter back to NULL.
   pub(crate) fn clear_bindings(&mut self) -> Result<()> {
      // SAFETY: raw is a live statement.
      let code = unsafe { ffi::sqlite3_clear_bindings(self.as_ptr()) };
      check(code, self.db())
   }

   /// Destroys the statement, reporting the engine's verdict.
   pub(crate) fn finalize(self) -> Result<()> {
      let db = self.db();
      let raw = self.as_ptr();
      std::mem::forget(self);
      // SAFETY: raw is live and ownership was just given up, so it is
      // finalized exactly once.
      let code = unsafe { ffi::sqlite3_finalize(raw) };
      check(code, db)
   }
}

impl Drop for PreparedStatement {
   fn drop(&mut self) {
      // SAFETY: raw is live; finalize() forgets self before finalizing.
      let code = unsafe { ffi::sqlite3_finalize(self.as_ptr()) };
      if code != ffi::SQLITE_OK {
         warn!(code, "Failed to finalize dropped statement");
      }
   }
}

/// Reports the engine's message for a step failure on `stmt`.
pub(crate) fn step_error(code: c_int, stmt: &PreparedStatement) -> Error {
   status::error(code, stmt.db())
}
