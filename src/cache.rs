//! Prepared statements keyed by their exact SQL text.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use libsqlite3_sys as ffi;
use tracing::{debug, trace, warn};

use crate::statement::PreparedStatement;
use crate::{Error, Result};

/// Holds at most one compiled statement per SQL string.
///
/// Keys are compared byte for byte: `SELECT 1` and `select 1` are two
/// entries.
#[derive(Debug, Default)]
pub(crate) struct StatementCache {
   statements: HashMap<String, PreparedStatement>,
}

impl StatementCache {
   /// Returns the statement for `sql`, compiling and caching it on a miss.
   ///
   /// A cached statement has its bindings cleared before it is handed out.
   /// Nothing is cached when compilation fails or `sql` holds no statement.
   pub(crate) fn prepare(
      &mut self,
      db: *mut ffi::sqlite3,
      sql: &str,
   ) -> Result<Option<&mut PreparedStatement>> {
      match self.statements.entry(sql.to_owned()) {
         Entry::Occupied(entry) => {
            trace!(sql = %sql, "Statement cache hit");
            let stmt = entry.into_mut();
            stmt.clear_bindings()?;
            Ok(Some(stmt))
         }
         Entry::Vacant(entry) => match PreparedStatement::prepare(db, sql)? {
            Some(stmt) => {
               debug!(sql = %sql, "Statement cache miss, compiled");
               Ok(Some(entry.insert(stmt)))
            }
            None => Ok(None),
         },
      }
   }

   /// Finalizes and evicts every statement.
   ///
   /// Keeps going after a failure; the cache is empty afterwards either way.
   pub(crate) fn flush(&mut self) -> Result<()> {
      let count = self.statements.len();
      let errors: Vec<Error> = self
         .statements
         .drain()
         .filter_map(|(sql, stmt)| {
            stmt.finalize().err().inspect(|e| {
               warn!(sql = %sql, error = %e, "Failed to finalize statement");
            })
         })
         .collect();

      debug!(count, failed = errors.len(), "Flushed statement cache");

      if errors.is_empty() {
         Ok(())
      } else {
         Err(Error::FailedToFinalize(errors))
      }
   }

   pub(crate) fn len(&self) -> usize {
      self.statements.len()
   }

   pub(crate) fn contains(&self, sql: &str) -> bool {
      self.statements.contains_key(sql)
   }
}
