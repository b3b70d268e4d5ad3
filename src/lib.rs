//! # sqlite-conn
//!
//! A single SQLite connection with a prepared-statement cache, typed rows and
//! structured engine errors, built directly on the SQLite C API.
//!
//! ## Core Types
//!
//! - **[`Connection`]**: owns one engine handle and the statements compiled
//!   against it
//! - **[`Value`]** / **[`Row`]**: typed scalars and name → value rows
//! - **[`Control`]**: continue or abort decision returned by row callbacks
//! - **[`ConnectionConfig`]**: settings applied when a connection opens
//! - **[`Error`]**: error type for connection operations
//!
//! ## Architecture
//!
//! - **Statement cache**: every SQL string is compiled once per connection and
//!   reused; bindings are cleared before each reuse
//! - **Step driver**: rows are materialized one at a time and handed to a
//!   callback before the next row is fetched; statements are always reset
//!   afterwards
//! - **Flush before close**: cached statements are finalized before the handle
//!   is released, on `close` and on drop
//! - **No internal locking**: one caller at a time, usually a dedicated worker
//!   that owns the connection
//!
//! ## Example
//!
//! ```
//! use sqlite_conn::{Connection, Control, Value};
//!
//! let mut db = Connection::memory()?;
//! db.exec("CREATE TABLE planets (id INTEGER PRIMARY KEY, au REAL, name TEXT)")?;
//!
//! let sql = "INSERT INTO planets VALUES (?, ?, ?)";
//! db.update(sql, &[0.into(), 0.4.into(), "Mercury".into()])?;
//! db.update(sql, &[1.into(), 0.7.into(), "Venus".into()])?;
//! db.update(sql, &[2.into(), 1.into(), "Earth".into()])?;
//!
//! let mut found = None;
//! db.query("SELECT name FROM planets WHERE au = 1", |row| {
//!    found = row.ok().and_then(|r| r.get("name").cloned());
//!    Control::Continue
//! })?;
//! assert_eq!(found, Some(Value::Text("Earth".into())));
//!
//! db.close()?;
//! # Ok::<_, sqlite_conn::Error>(())
//! ```

mod bind;
mod cache;
mod column;
mod config;
mod connection;
mod driver;
mod error;
mod exec;
mod location;
mod statement;
mod status;
mod value;

// Re-export public types
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use driver::Control;
pub use error::{Error, Result};
pub use value::{Row, TextRow, Value};

/// The version of the linked SQLite library, e.g. `3.46.0`.
pub fn version() -> String {
   // SAFETY: sqlite3_libversion returns a static string.
   unsafe { status::text(libsqlite3_sys::sqlite3_libversion()) }.unwrap_or_default()
}
