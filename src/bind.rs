//! Positional parameter binding.

use std::os::raw::c_int;

use libsqlite3_sys as ffi;
use serde_json::Value as JsonValue;

use crate::statement::PreparedStatement;
use crate::status::check;
use crate::{Error, Result, Value};

/// Binds `value` to the 1-based parameter `index`.
///
/// Text is bound with `SQLITE_TRANSIENT`, so the engine copies the bytes
/// before this returns.
pub(crate) fn bind(stmt: &mut PreparedStatement, index: c_int, value: &Value) -> Result<()> {
   let raw = stmt.as_ptr();
   // SAFETY: raw is a live statement; text pointers are valid for the
   // duration of the call and copied by the engine.
   let code = unsafe {
      match value {
         Value::Null => ffi::sqlite3_bind_null(raw, index),
         Value::Integer(i) => ffi::sqlite3_bind_int64(raw, index, *i),
         Value::Real(r) => ffi::sqlite3_bind_double(raw, index, *r),
         Value::Text(s) => {
            let len = c_int::try_from(s.len()).map_err(|_| Error::Sqlite {
               code: ffi::SQLITE_TOOBIG,
               message: "string or blob too big".into(),
            })?;
            ffi::sqlite3_bind_text(
               raw,
               index,
               s.as_ptr().cast(),
               len,
               ffi::SQLITE_TRANSIENT(),
            )
         }
      }
   };
   check(code, stmt.db())
}

/// Binds every parameter in order, starting at index 1.
///
/// Stops at the first failure; parameters bound before it stay bound.
pub(crate) fn bind_all(stmt: &mut PreparedStatement, params: &[Value]) -> Result<()> {
   for (index, param) in (1..).zip(params) {
      bind(stmt, index, param)?;
   }
   Ok(())
}

/// Binds dynamically typed JSON arguments in order, starting at index 1.
///
/// Each argument is converted right before it is bound, so an unsupported
/// argument leaves the earlier ones bound.
pub(crate) fn bind_json(stmt: &mut PreparedStatement, params: &[JsonValue]) -> Result<()> {
   for (index, param) in (1..).zip(params) {
      let value = Value::try_from(param)?;
      bind(stmt, index, &value)?;
   }
   Ok(())
}
