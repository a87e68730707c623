//! Case-insensitive, multi-valued view used to rewrite response headers.

use crate::error::CompressionError;
use http::header::{self, AsHeaderName, HeaderMap, HeaderName, HeaderValue, ToStrError};

/// Mutable view over a response's [`HeaderMap`].
///
/// Reads see the first entry for a name; writes collapse every entry for a
/// name into one, kept where the first entry was.
#[derive(Debug)]
pub struct HeaderView<'a> {
    map: &'a mut HeaderMap,
}

impl<'a> HeaderView<'a> {
    /// Wraps a header map without copying it.
    pub fn new(map: &'a mut HeaderMap) -> Self {
        Self { map }
    }

    /// Returns the first value for `name`, or `None` if absent or not visible ASCII.
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.map.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value for `name` in order. Values that are not visible
    /// ASCII come back as errors rather than being skipped.
    pub fn get_all<K: AsHeaderName>(
        &self,
        name: K,
    ) -> impl Iterator<Item = Result<&str, ToStrError>> {
        self.map.get_all(name).into_iter().map(HeaderValue::to_str)
    }

    /// Returns whether any entry exists for `name`.
    pub fn contains<K: AsHeaderName>(&self, name: K) -> bool {
        self.map.contains_key(name)
    }

    /// Replaces all entries for `name` with a single `value`.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue) {
        self.map.insert(name, value);
    }

    /// Removes every entry for `name`.
    pub fn delete<K: AsHeaderName>(&mut self, name: K) {
        self.map.remove(name);
    }

    /// Adds `token` to `Vary`, keeping whatever tokens are already listed.
    ///
    /// Multiple `Vary` entries are merged into one comma-separated value. A
    /// token that is already listed, or a `Vary: *`, leaves the header alone.
    pub fn append_vary(&mut self, token: &'static str) -> Result<(), CompressionError> {
        let mut joined: Vec<u8> = Vec::new();
        for value in self.map.get_all(header::VARY) {
            let listed = value.to_str().is_ok_and(|v| {
                v.split(',')
                    .map(str::trim)
                    .any(|t| t == "*" || t.eq_ignore_ascii_case(token))
            });
            if listed {
                return Ok(());
            }
            if !joined.is_empty() {
                joined.extend_from_slice(b", ");
            }
            joined.extend_from_slice(value.as_bytes());
        }

        if joined.is_empty() {
            self.set(header::VARY, HeaderValue::from_static(token));
            return Ok(());
        }

        joined.extend_from_slice(b", ");
        joined.extend_from_slice(token.as_bytes());
        let value = HeaderValue::from_bytes(&joined)?;
        self.set(header::VARY, value);
        Ok(())
    }
}
