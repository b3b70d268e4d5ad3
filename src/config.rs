//! Configuration for opening a connection

use std::time::Duration;

/// Configuration applied whenever a [`Connection`](crate::Connection) opens.
///
/// # Examples
///
/// ```
/// use sqlite_conn::ConnectionConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = ConnectionConfig::default();
///
/// // Override just one field
/// let config = ConnectionConfig {
///     busy_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
   /// How long the engine retries when a table is locked by another
   /// connection before reporting `SQLITE_BUSY`.
   ///
   /// Zero keeps the engine's default of failing immediately.
   ///
   /// Default: 0
   pub busy_timeout: Duration,

   /// Create the database file if it does not exist.
   ///
   /// When false, opening a missing file fails with `SQLITE_CANTOPEN`.
   /// Has no effect on in-memory databases.
   ///
   /// Default: true
   pub create_if_missing: bool,
}

impl Default for ConnectionConfig {
   fn default() -> Self {
      Self {
         busy_timeout: Duration::ZERO,
         create_if_missing: true,
      }
   }
}
