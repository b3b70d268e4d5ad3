//! Parsing of `file:` URLs into local paths.

use crate::{Error, Result};

/// Extracts the local path from a `file:` URL.
///
/// Accepts `file:///abs/path`, `file://localhost/abs/path` and the opaque
/// `file:relative/path` form. Percent escapes in the path are decoded; query
/// and fragment are dropped. Any other scheme, a remote host or an empty path
/// is rejected.
pub(crate) fn file_path(url: &str) -> Result<String> {
   let invalid = || Error::InvalidUrl(url.to_string());

   let (scheme, rest) = url.split_once(':').ok_or_else(invalid)?;
   if !scheme.eq_ignore_ascii_case("file") {
      return Err(invalid());
   }

   let rest = rest.split(['?', '#']).next().unwrap_or_default();

   let path = match rest.strip_prefix("//") {
      Some(authority_and_path) => {
         let (host, path) = match authority_and_path.find('/') {
            Some(i) => authority_and_path.split_at(i),
            None => (authority_and_path, ""),
         };
         if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
            return Err(invalid());
         }
         path
      }
      None => rest,
   };

   if path.is_empty() {
      return Err(invalid());
   }

   // urlencoding passes malformed escapes through untouched
   if !valid_escapes(path.as_bytes()) {
      return Err(invalid());
   }
   urlencoding::decode(path)
      .map(|decoded| decoded.into_owned())
      .map_err(|_| invalid())
}

/// Every `%` must be followed by exactly two hex digits.
fn valid_escapes(data: &[u8]) -> bool {
   let mut i = 0;
   while i < data.len() {
      if data[i] == b'%' {
         match data.get(i + 1..i + 3) {
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
            _ => return false,
         }
      } else {
         i += 1;
      }
   }
   true
}
