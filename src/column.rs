//! Materialization of result columns into [`Value`]s.

use std::os::raw::c_int;

use libsqlite3_sys as ffi;

use crate::statement::PreparedStatement;
use crate::status::text;
use crate::{Row, Value};

/// Reads column `index` of the current row.
///
/// Returns `None` for NULL and BLOB values and for columns whose name the
/// engine cannot provide.
pub(crate) fn read_column(stmt: &PreparedStatement, index: c_int) -> Option<(String, Value)> {
   let raw = stmt.as_ptr();
   // SAFETY: raw is a live statement positioned on a row and index is below
   // the column count. Column pointers are copied before the next call that
   // could invalidate them.
   unsafe {
      let name = text(ffi::sqlite3_column_name(raw, index))?;
      let value = match ffi::sqlite3_column_type(raw, index) {
         ffi::SQLITE_TEXT => {
            let ptr = ffi::sqlite3_column_text(raw, index);
            let len = ffi::sqlite3_column_bytes(raw, index);
            if ptr.is_null() {
               return None;
            }
            let bytes = std::slice::from_raw_parts(ptr, usize::try_from(len).unwrap_or(0));
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
         }
         ffi::SQLITE_INTEGER => Value::Integer(ffi::sqlite3_column_int64(raw, index)),
         ffi::SQLITE_FLOAT => Value::Real(ffi::sqlite3_column_double(raw, index)),
         _ => return None,
      };
      Some((name, value))
   }
}

/// Materializes every column of the current row.
pub(crate) fn read_row(stmt: &PreparedStatement) -> Row {
   // SAFETY: raw is a live statement.
   let count = unsafe { ffi::sqlite3_column_count(stmt.as_ptr()) };
   (0..count).filter_map(|i| read_column(stmt, i)).collect()
}
