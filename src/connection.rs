//! A single SQLite connection and its statement cache.

use std::ffi::CString;
use std::fmt;
use std::os::raw::c_int;
use std::path::PathBuf;
use std::ptr::{self, NonNull};

use libsqlite3_sys as ffi;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::cache::StatementCache;
use crate::config::ConnectionConfig;
use crate::driver::{self, Control};
use crate::status::{self, check, text};
use crate::{Error, Result, Row, TextRow, Value, bind, exec, location};

const MEMORY: &str = ":memory:";

/// A connection to one SQLite database, in memory or backed by a file.
///
/// The connection is either open, holding a live engine handle, or closed,
/// holding nothing. Prepared statements are cached per SQL string for as long
/// as the connection stays open and are finalized before the handle is
/// released.
///
/// There is no internal locking. A `Connection` can be moved to another thread
/// but every call must come from one thread at a time, typically a dedicated
/// worker that owns it.
///
/// ## Lifecycle
///
/// ```text
/// new() ── open(url?) ──▶ open ── close() ──▶ closed ── open(url?) ──▶ open
/// ```
pub struct Connection {
   // Declared before `db` so a dropped connection finalizes first.
   cache: StatementCache,
   db: Option<NonNull<ffi::sqlite3>>,
   config: ConnectionConfig,
}

// SAFETY: the handle and its statements are owned exclusively by this value
// and `open` refuses engines built with SQLITE_THREADSAFE=0, so moving them
// between threads is sound. Shared access is ruled out because Connection is
// not Sync.
unsafe impl Send for Connection {}

impl Connection {
   /// Creates a closed connection using the default configuration.
   pub fn new() -> Self {
      Self::with_config(ConnectionConfig::default())
   }

   /// Creates a closed connection that applies `config` whenever it opens.
   pub fn with_config(config: ConnectionConfig) -> Self {
      Self {
         cache: StatementCache::default(),
         db: None,
         config,
      }
   }

   /// Opens a private, temporary in-memory database.
   pub fn memory() -> Result<Self> {
      let mut conn = Self::new();
      conn.open(None)?;
      Ok(conn)
   }

   /// Opens, creating if needed, the database at the `file:` URL `url`.
   pub fn with_url(url: &str) -> Result<Self> {
      let mut conn = Self::new();
      conn.open(Some(url))?;
      Ok(conn)
   }

   /// Opens the database at `url`, or an in-memory database when `url` is
   /// `None`.
   ///
   /// # Errors
   ///
   /// - [`Error::AlreadyOpen`] if this connection already holds a handle
   /// - [`Error::InvalidUrl`] if `url` is not a local `file:` URL
   /// - [`Error::Sqlite`] if the engine cannot open the database, or was built
   ///   with `SQLITE_THREADSAFE=0`
   pub fn open(&mut self, url: Option<&str>) -> Result<()> {
      if self.db.is_some() {
         return Err(Error::AlreadyOpen(self.to_string()));
      }
      // SAFETY: sqlite3_threadsafe only reads a compile-time constant.
      if unsafe { ffi::sqlite3_threadsafe() } == 0 {
         return Err(Error::Sqlite {
            code: ffi::SQLITE_MISUSE,
            message: "SQLite was built without thread safety".into(),
         });
      }

      let filename = match url {
         Some(url) => location::file_path(url)?,
         None => MEMORY.to_string(),
      };
      let c_filename =
         CString::new(filename.as_str()).map_err(|_| Error::InvalidUrl(filename.clone()))?;

      let mut flags = ffi::SQLITE_OPEN_READWRITE;
      if self.config.create_if_missing {
         flags |= ffi::SQLITE_OPEN_CREATE;
      }

      let mut raw: *mut ffi::sqlite3 = ptr::null_mut();
      // SAFETY: c_filename is NUL-terminated and raw receives the handle.
      let code = unsafe { ffi::sqlite3_open_v2(c_filename.as_ptr(), &mut raw, flags, ptr::null()) };

      if let Err(e) = check(code, raw) {
         if !raw.is_null() {
            // SAFETY: even a failed open allocates a handle that must be closed.
            unsafe { ffi::sqlite3_close(raw) };
         }
         return Err(e);
      }

      let Some(db) = NonNull::new(raw) else {
         return Err(status::describe(ffi::SQLITE_NOMEM));
      };

      if !self.config.busy_timeout.is_zero() {
         let ms = c_int::try_from(self.config.busy_timeout.as_millis()).unwrap_or(c_int::MAX);
         // SAFETY: db is live.
         let code = unsafe { ffi::sqlite3_busy_timeout(db.as_ptr(), ms) };
         if let Err(e) = check(code, db.as_ptr()) {
            // SAFETY: db is live and has no statements yet.
            unsafe { ffi::sqlite3_close(db.as_ptr()) };
            return Err(e);
         }
      }

      self.db = Some(db);
      debug!(database = %self, "Opened database");
      Ok(())
   }

   /// Returns true while the connection holds a live handle.
   pub fn is_open(&self) -> bool {
      self.db.is_some()
   }

   /// The backing file, or `None` for in-memory and closed connections.
   pub fn path(&self) -> Option<PathBuf> {
      self.filename().filter(|f| !f.is_empty()).map(PathBuf::from)
   }

   fn filename(&self) -> Option<String> {
      let db = self.db?;
      // SAFETY: db is live and "main" always exists.
      let ptr = unsafe { ffi::sqlite3_db_filename(db.as_ptr(), c"main".as_ptr()) };
      // SAFETY: the filename stays valid while the handle is open.
      Some(unsafe { text(ptr) }.unwrap_or_default())
   }

   pub(crate) fn handle(&self) -> Result<*mut ffi::sqlite3> {
      self.db.map(NonNull::as_ptr).ok_or(Error::NotOpen)
   }

   /// Runs a query, handing each row to `on_row`.
   ///
   /// The statement is prepared once per SQL string and reused on later
   /// calls. Returning [`Control::Abort`] from `on_row` stops iteration and
   /// fails the query with `SQLITE_ABORT`. An engine failure is handed to
   /// `on_row` once as `Err` and then returned.
   ///
   /// ```
   /// use sqlite_conn::{Connection, Control};
   ///
   /// let mut db = Connection::memory()?;
   /// db.exec("CREATE TABLE planets (name TEXT); INSERT INTO planets VALUES ('Earth');")?;
   ///
   /// let mut names = Vec::new();
   /// db.query("SELECT name FROM planets", |row| {
   ///    if let Ok(row) = row {
   ///       names.extend(row.get("name").and_then(|v| v.as_text()).map(str::to_owned));
   ///    }
   ///    Control::Continue
   /// })?;
   /// assert_eq!(names, ["Earth"]);
   /// # Ok::<_, sqlite_conn::Error>(())
   /// ```
   pub fn query<F>(&mut self, sql: &str, on_row: F) -> Result<()>
   where
      F: FnMut(std::result::Result<&Row, &Error>) -> Control,
   {
      let db = self.handle()?;
      let Some(stmt) = self.cache.prepare(db, sql)? else {
         return Ok(());
      };
      driver::run(stmt, on_row)
   }

   /// Runs a statement with positional parameters, discarding any rows.
   ///
   /// ```
   /// use sqlite_conn::Connection;
   ///
   /// let mut db = Connection::memory()?;
   /// db.exec("CREATE TABLE planets (id INTEGER PRIMARY KEY, au REAL, name TEXT)")?;
   /// db.update("INSERT INTO planets VALUES (?, ?, ?)", &[3.into(), 1.0.into(), "Earth".into()])?;
   /// assert_eq!(db.changes()?, 1);
   /// # Ok::<_, sqlite_conn::Error>(())
   /// ```
   pub fn update(&mut self, sql: &str, params: &[Value]) -> Result<()> {
      let db = self.handle()?;
      let Some(stmt) = self.cache.prepare(db, sql)? else {
         return Ok(());
      };
      bind::bind_all(stmt, params)?;
      driver::run_discarding(stmt)
   }

   /// Like [`update`](Self::update), for dynamically typed JSON parameters.
   ///
   /// Arrays and objects fail with [`Error::UnsupportedType`]; the parameters
   /// before them remain bound until the statement is next used.
   pub fn update_json(&mut self, sql: &str, params: &[JsonValue]) -> Result<()> {
      let db = self.handle()?;
      let Some(stmt) = self.cache.prepare(db, sql)? else {
         return Ok(());
      };
      bind::bind_json(stmt, params)?;
      driver::run_discarding(stmt)
   }

   /// Runs a query with positional parameters and collects every row.
   pub fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
      let db = self.handle()?;
      let Some(stmt) = self.cache.prepare(db, sql)? else {
         return Ok(Vec::new());
      };
      bind::bind_all(stmt, params)?;

      let mut rows = Vec::new();
      driver::run(stmt, |row| {
         if let Ok(row) = row {
            rows.push(row.clone());
         }
         Control::Continue
      })?;
      Ok(rows)
   }

   /// Runs zero or more semicolon-separated statements, bypassing the cache.
   pub fn exec(&mut self, sql: &str) -> Result<()> {
      exec::exec(self.handle()?, sql, None)
   }

   /// Runs zero or more semicolon-separated statements, handing every row of
   /// every statement to `on_row` in the engine's text rendering.
   ///
   /// Returning [`Control::Abort`] stops the whole batch with `SQLITE_ABORT`.
   pub fn exec_with<F>(&mut self, sql: &str, mut on_row: F) -> Result<()>
   where
      F: FnMut(&TextRow) -> Control,
   {
      exec::exec(self.handle()?, sql, Some(&mut on_row))
   }

   /// Finalizes and evicts every cached statement.
   ///
   /// All statements are attempted; failures are collected into
   /// [`Error::FailedToFinalize`]. The cache is empty afterwards either way.
   pub fn flush(&mut self) -> Result<()> {
      self.handle()?;
      self.cache.flush()
   }

   /// Flushes the cache and closes the handle.
   ///
   /// The handle is closed even when the flush fails; the flush error is
   /// reported first. If the engine refuses to close, the connection stays
   /// open.
   pub fn close(&mut self) -> Result<()> {
      let db = self.handle()?;
      let flushed = self.cache.flush();
      let database = self.to_string();

      // SAFETY: db is live and owned by self.
      let code = unsafe { ffi::sqlite3_close(db) };
      let closed = check(code, db);
      if closed.is_ok() {
         self.db = None;
         debug!(%database, "Closed database");
      }

      flushed.and(closed)
   }

   /// Number of rows changed by the most recent INSERT, UPDATE or DELETE.
   pub fn changes(&self) -> Result<u64> {
      let db = self.handle()?;
      // SAFETY: db is live.
      let n = unsafe { ffi::sqlite3_changes(db) };
      Ok(u64::try_from(n).unwrap_or_default())
   }

   /// Rowid of the most recent successful INSERT, 0 if there was none.
   pub fn last_insert_rowid(&self) -> Result<i64> {
      let db = self.handle()?;
      // SAFETY: db is live.
      Ok(unsafe { ffi::sqlite3_last_insert_rowid(db) })
   }

   /// Number of statements currently held by the cache.
   pub fn cached_statements(&self) -> usize {
      self.cache.len()
   }

   /// Returns true if a compiled statement for exactly `sql` is cached.
   pub fn is_cached(&self, sql: &str) -> bool {
      self.cache.contains(sql)
   }
}

impl Default for Connection {
   fn default() -> Self {
      Self::new()
   }
}

impl Drop for Connection {
   fn drop(&mut self) {
      let Some(db) = self.db.take() else {
         return;
      };
      if let Err(e) = self.cache.flush() {
         warn!(error = %e, "Failed to flush statements while dropping connection");
      }
      // SAFETY: db is live and every cached statement has been finalized.
      let code = unsafe { ffi::sqlite3_close(db.as_ptr()) };
      if code != ffi::SQLITE_OK {
         warn!(code, "Failed to close dropped connection");
      }
   }
}

/// The backing file path, `in-memory`, or `closed`.
impl fmt::Display for Connection {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.filename() {
         None => f.write_str("closed"),
         Some(name) if name.is_empty() => f.write_str("in-memory"),
         Some(name) => f.write_str(&name),
      }
   }
}

impl fmt::Debug for Connection {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Connection")
         .field("database", &self.to_string())
         .field("cached_statements", &self.cache.len())
         .field("config", &self.config)
         .finish()
   }
}
