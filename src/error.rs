use std::os::raw::c_int;

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by a [`Connection`](crate::Connection).
///
/// Every failure reported by the engine becomes [`Error::Sqlite`]; the other
/// variants describe misuse of the connection itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// `open` was called on a connection that already holds a live handle.
   #[error("{0} already open")]
   AlreadyOpen(String),

   /// The locator passed to `open` is not a local `file:` URL.
   #[error("invalid URL: {0}")]
   InvalidUrl(String),

   /// The operation needs a live handle but the connection is closed.
   #[error("not open")]
   NotOpen,

   /// Non-success result code from the engine, with its diagnostic message.
   ///
   /// Constraint violations, syntax errors and callback-requested aborts
   /// (`SQLITE_ABORT`) all land here.
   #[error("{code}: {message}")]
   Sqlite { code: c_int, message: String },

   /// One or more cached statements failed to finalize during a flush.
   #[error("failed to finalize: [{}]", join(.0))]
   FailedToFinalize(Vec<Error>),

   /// A dynamically typed parameter has no SQLite binding.
   #[error("unsupported type: {0}")]
   UnsupportedType(String),
}

fn join(errors: &[Error]) -> String {
   errors
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join(", ")
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Engine errors are reported as `SQLITE_<code>` using the primary
   /// numeric result code.
   pub fn error_code(&self) -> String {
      match self {
         Error::AlreadyOpen(_) => "ALREADY_OPEN".to_string(),
         Error::InvalidUrl(_) => "INVALID_URL".to_string(),
         Error::NotOpen => "NOT_OPEN".to_string(),
         Error::Sqlite { code, .. } => format!("SQLITE_{}", code),
         Error::FailedToFinalize(_) => "FAILED_TO_FINALIZE".to_string(),
         Error::UnsupportedType(_) => "UNSUPPORTED_TYPE".to_string(),
      }
   }

   /// The engine result code, if this error came from the engine.
   pub fn sqlite_code(&self) -> Option<c_int> {
      match self {
         Error::Sqlite { code, .. } => Some(*code),
         _ => None,
      }
   }
}
