//! `sqlite3_exec` with a Rust row callback.

use std::any::Any;
use std::ffi::{CString, c_void};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use libsqlite3_sys as ffi;
use tracing::trace;

use crate::status::{self, text};
use crate::{Control, Error, Result, TextRow};

type RowCallback<'a> = &'a mut dyn FnMut(&TextRow) -> Control;

/// State shared with the C trampoline for the duration of one exec call.
struct ExecContext<'a> {
   callback: RowCallback<'a>,
   panic: Option<Box<dyn Any + Send + 'static>>,
}

/// Runs zero or more semicolon-separated statements.
///
/// `callback` sees every row of every statement. Returning
/// [`Control::Abort`] stops the whole batch with `SQLITE_ABORT`. A panic in
/// the callback also stops the batch and is resumed once the engine has
/// returned.
pub(crate) fn exec(
   db: *mut ffi::sqlite3,
   sql: &str,
   callback: Option<RowCallback<'_>>,
) -> Result<()> {
   let sql = CString::new(sql).map_err(|_| Error::Sqlite {
      code: ffi::SQLITE_MISUSE,
      message: "SQL contains an interior NUL byte".into(),
   })?;

   let mut context = callback.map(|callback| ExecContext {
      callback,
      panic: None,
   });
   let (trampoline, arg): (Option<ExecCallback>, *mut c_void) = match context.as_mut() {
      Some(ctx) => (Some(exec_row as ExecCallback), ptr::from_mut(ctx).cast()),
      None => (None, ptr::null_mut()),
   };

   let mut errmsg: *mut c_char = ptr::null_mut();
   // SAFETY: db is live, sql is NUL-terminated, arg points to context which
   // outlives the call.
   let code = unsafe { ffi::sqlite3_exec(db, sql.as_ptr(), trampoline, arg, &mut errmsg) };

   let message = if errmsg.is_null() {
      None
   } else {
      // SAFETY: errmsg was allocated by the engine and is freed exactly once.
      unsafe {
         let message = text(errmsg);
         ffi::sqlite3_free(errmsg.cast());
         message
      }
   };

   if let Some(payload) = context.and_then(|ctx| ctx.panic) {
      panic::resume_unwind(payload);
   }

   if code == ffi::SQLITE_OK {
      return Ok(());
   }
   match message {
      Some(message) => Err(Error::Sqlite { code, message }),
      None => Err(status::error(code, db)),
   }
}

type ExecCallback =
   unsafe extern "C" fn(*mut c_void, c_int, *mut *mut c_char, *mut *mut c_char) -> c_int;

unsafe extern "C" fn exec_row(
   arg: *mut c_void,
   count: c_int,
   values: *mut *mut c_char,
   names: *mut *mut c_char,
) -> c_int {
   // SAFETY: arg is the ExecContext passed to sqlite3_exec, exclusively
   // borrowed for the duration of the call.
   let ctx = unsafe { &mut *arg.cast::<ExecContext<'_>>() };

   let mut row = TextRow::new();
   if !values.is_null() && !names.is_null() {
      for i in 0..usize::try_from(count).unwrap_or(0) {
         // SAFETY: the engine provides `count` name and value pointers; a
         // NULL value pointer marks an SQL NULL.
         let (name, value) = unsafe { (text(*names.add(i)), text(*values.add(i))) };
         if let (Some(name), Some(value)) = (name, value) {
            row.insert(name, value);
         }
      }
   }

   let callback = &mut ctx.callback;
   match panic::catch_unwind(AssertUnwindSafe(|| callback(&row))) {
      Ok(Control::Continue) => 0,
      Ok(Control::Abort) => {
         trace!("Exec callback requested abort");
         1
      }
      Err(payload) => {
         ctx.panic = Some(payload);
         1
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::Connection;

   #[test]
   fn test_exec_without_callback() {
      let conn = Connection::memory().unwrap();
      let db = conn.handle().unwrap();
      exec(db, "CREATE TABLE t (x); INSERT INTO t VALUES (1);", None).unwrap();
      exec(db, "", None).unwrap();
   }

   #[test]
   fn test_exec_rows_as_text() {
      let conn = Connection::memory().unwrap();
      let db = conn.handle().unwrap();

      let mut rows = Vec::new();
      let mut cb = |row: &TextRow| {
         rows.push(row.clone());
         Control::Continue
      };
      exec(db, "SELECT 1 AS a, 0.5 AS b, NULL AS c, 'x' AS d", Some(&mut cb)).unwrap();

      assert_eq!(rows.len(), 1);
      assert_eq!(rows[0].get("a").map(String::as_str), Some("1"));
      assert_eq!(rows[0].get("b").map(String::as_str), Some("0.5"));
      assert!(!rows[0].contains_key("c"));
      assert_eq!(rows[0].get("d").map(String::as_str), Some("x"));
   }

   #[test]
   fn test_exec_interior_nul() {
      let conn = Connection::memory().unwrap();
      let db = conn.handle().unwrap();
      let err = exec(db, "SELECT 1;\0SELECT 2;", None).unwrap_err();
      assert_eq!(err.sqlite_code(), Some(ffi::SQLITE_MISUSE));
   }

   #[test]
   fn test_exec_callback_panic_is_resumed() {
      let conn = Connection::memory().unwrap();
      let db = conn.handle().unwrap();

      let result = panic::catch_unwind(AssertUnwindSafe(|| {
         let mut cb = |_: &TextRow| -> Control { panic!("boom") };
         let _ = exec(db, "SELECT 1; SELECT 2;", Some(&mut cb));
      }));

      let payload = result.unwrap_err();
      assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));

      // The connection is still usable
      exec(db, "SELECT 1", None).unwrap();
   }
}
