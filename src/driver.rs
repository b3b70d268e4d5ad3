//! The step loop shared by `query`, `update` and `fetch_all`.

use std::panic::{self, AssertUnwindSafe};

use libsqlite3_sys as ffi;
use tracing::trace;

use crate::column::read_row;
use crate::statement::{PreparedStatement, step_error};
use crate::status::describe;
use crate::{Error, Result, Row};

/// Decision returned by a row callback.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
   /// Fetch the next row.
   #[default]
   Continue,
   /// Stop iterating; the operation fails with `SQLITE_ABORT`.
   Abort,
}

/// Steps `stmt` to completion, handing each row to `on_row`.
///
/// An engine failure is passed to `on_row` once as `Err` and then returned.
/// The statement is reset afterwards on every path, including a panic in
/// `on_row`; a reset failure takes priority over the loop's own result.
pub(crate) fn run<F>(stmt: &mut PreparedStatement, mut on_row: F) -> Result<()>
where
   F: FnMut(std::result::Result<&Row, &Error>) -> Control,
{
   let outcome = panic::catch_unwind(AssertUnwindSafe(|| loop {
      match stmt.step() {
         ffi::SQLITE_ROW => {
            let row = read_row(stmt);
            if on_row(Ok(&row)) == Control::Abort {
               trace!("Row callback requested abort");
               break Err(describe(ffi::SQLITE_ABORT));
            }
         }
         ffi::SQLITE_DONE => break Ok(()),
         code => {
            let err = step_error(code, stmt);
            let _ = on_row(Err(&err));
            break Err(err);
         }
      }
   }));

   let reset = stmt.reset();
   match outcome {
      Ok(outcome) => reset.and(outcome),
      Err(payload) => panic::resume_unwind(payload),
   }
}

/// Steps `stmt` to completion, discarding rows.
pub(crate) fn run_discarding(stmt: &mut PreparedStatement) -> Result<()> {
   run(stmt, |_| Control::Continue)
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{Connection, Value};

   fn prepare(conn: &Connection, sql: &str) -> PreparedStatement {
      PreparedStatement::prepare(conn.handle().unwrap(), sql)
         .unwrap()
         .unwrap()
   }

   #[test]
   fn test_collects_every_row() {
      let conn = Connection::memory().unwrap();
      let mut stmt = prepare(&conn, "SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3");

      let mut seen = Vec::new();
      run(&mut stmt, |row| {
         seen.push(row.unwrap().get("n").cloned());
         Control::Continue
      })
      .unwrap();

      assert_eq!(
         seen,
         vec![
            Some(Value::Integer(1)),
            Some(Value::Integer(2)),
            Some(Value::Integer(3))
         ]
      );
   }

   #[test]
   fn test_abort_on_first_row() {
      let conn = Connection::memory().unwrap();
      let mut stmt = prepare(&conn, "SELECT 1 UNION ALL SELECT 2");

      let mut count = 0;
      let err = run(&mut stmt, |_| {
         count += 1;
         Control::Abort
      })
      .unwrap_err();

      assert_eq!(count, 1);
      assert_eq!(err.sqlite_code(), Some(ffi::SQLITE_ABORT));
   }

   #[test]
   fn test_statement_is_reusable_after_abort() {
      let conn = Connection::memory().unwrap();
      let mut stmt = prepare(&conn, "SELECT 1 UNION ALL SELECT 2");

      let _ = run(&mut stmt, |_| Control::Abort);

      let mut count = 0;
      run(&mut stmt, |_| {
         count += 1;
         Control::Continue
      })
      .unwrap();
      assert_eq!(count, 2);
   }

   #[test]
   fn test_statement_is_reset_after_callback_panic() {
      let conn = Connection::memory().unwrap();
      let mut stmt = prepare(&conn, "SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3");

      let result = panic::catch_unwind(AssertUnwindSafe(|| {
         let _ = run(&mut stmt, |_| panic!("boom"));
      }));
      assert!(result.is_err());

      let mut seen = Vec::new();
      run(&mut stmt, |row| {
         seen.push(row.unwrap().get("n").cloned());
         Control::Continue
      })
      .unwrap();
      assert_eq!(
         seen,
         vec![
            Some(Value::Integer(1)),
            Some(Value::Integer(2)),
            Some(Value::Integer(3))
         ]
      );
   }

   #[test]
   fn test_error_is_reported_once() {
      let mut conn = Connection::memory().unwrap();
      conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
         .unwrap();
      let mut stmt = prepare(&conn, "INSERT INTO t VALUES (1)");

      let mut errors = 0;
      let mut rows = 0;
      let err = run(&mut stmt, |result| {
         match result {
            Ok(_) => rows += 1,
            Err(e) => {
               assert_eq!(e.sqlite_code(), Some(ffi::SQLITE_CONSTRAINT));
               errors += 1;
            }
         }
         Control::Continue
      })
      .unwrap_err();

      assert_eq!(err.sqlite_code(), Some(ffi::SQLITE_CONSTRAINT));
      assert_eq!((errors, rows), (1, 0));
   }

   #[test]
   fn test_empty_result_never_calls_back() {
      let mut conn = Connection::memory().unwrap();
      conn.exec("CREATE TABLE t (id INTEGER)").unwrap();
      let mut stmt = prepare(&conn, "SELECT * FROM t");

      let mut count = 0;
      run(&mut stmt, |_| {
         count += 1;
         Control::Continue
      })
      .unwrap();
      assert_eq!(count, 0);
   }
}
