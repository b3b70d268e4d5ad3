//! Translation of engine result codes into [`Error`] values.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use libsqlite3_sys as ffi;

use crate::{Error, Result};

const UNKNOWN_ERROR: &str = "unknown error";

/// Checks an engine result code.
///
/// Anything other than `SQLITE_OK` becomes [`Error::Sqlite`] carrying the
/// connection's most recent diagnostic message.
pub(crate) fn check(code: c_int, db: *mut ffi::sqlite3) -> Result<()> {
   if code == ffi::SQLITE_OK {
      return Ok(());
   }
   Err(error(code, db))
}

/// Builds the error for a code already known to be a failure.
pub(crate) fn error(code: c_int, db: *mut ffi::sqlite3) -> Error {
   let message = if db.is_null() {
      None
   } else {
      // SAFETY: db is a live handle owned by the caller.
      unsafe { text(ffi::sqlite3_errmsg(db)) }
   };
   Error::Sqlite {
      code,
      message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
   }
}

/// Builds the error for `code` using the engine's generic description of it
/// rather than the connection's last message.
pub(crate) fn describe(code: c_int) -> Error {
   // SAFETY: sqlite3_errstr returns a static string for every code.
   let message = unsafe { text(ffi::sqlite3_errstr(code)) };
   Error::Sqlite {
      code,
      message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
   }
}

/// Copies a NUL-terminated engine string, `None` for null or invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid for
/// the duration of the call.
pub(crate) unsafe fn text(ptr: *const c_char) -> Option<String> {
   if ptr.is_null() {
      return None;
   }
   // SAFETY: guaranteed by the caller.
   let s = unsafe { CStr::from_ptr(ptr) };
   s.to_str().ok().map(str::to_owned)
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::ptr;

   #[test]
   fn test_check_ok() {
      assert!(check(ffi::SQLITE_OK, ptr::null_mut()).is_ok());
   }

   #[test]
   fn test_check_without_handle_falls_back_to_unknown_error() {
      let err = check(ffi::SQLITE_ERROR, ptr::null_mut()).unwrap_err();
      match err {
         Error::Sqlite { code, message } => {
            assert_eq!(code, ffi::SQLITE_ERROR);
            assert_eq!(message, "unknown error");
         }
         other => panic!("unexpected error: {other:?}"),
      }
   }

   #[test]
   fn test_describe_abort() {
      let err = describe(ffi::SQLITE_ABORT);
      assert_eq!(err.sqlite_code(), Some(4));
      let msg = err.to_string();
      assert!(
         msg.contains("query aborted") || msg.contains("callback requested query abort"),
         "unexpected message: {msg}"
      );
   }

   #[test]
   fn test_text_null() {
      assert_eq!(unsafe { text(ptr::null()) }, None);
   }
}
