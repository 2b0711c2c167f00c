//! Case-insensitive header map.
//!
//! Header names are compared ASCII case-insensitively but stored with the
//! casing they were first inserted with, so `Content-Length` stays
//! `Content-Length` on the wire while `content-length` still finds it.

use std::fmt;

/// Ordered, case-insensitive map of header names to values.
///
/// A `Headers` never holds two entries whose names differ only by case:
/// inserting `host` when `Host` is present replaces the value in place.
///
/// # Example
///
/// ```
/// use strata_core::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Length", "4");
/// headers.insert("content-length", "5");
///
/// assert_eq!(headers.len(), 1);
/// assert_eq!(headers.get("CONTENT-LENGTH"), Some("5"));
/// assert_eq!(headers.iter().next(), Some(("Content-Length", "5")));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of logical headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No header is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Value of a header, looked up case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// A header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets a header, returning the previous value of the same logical header.
    ///
    /// The casing of an existing entry is kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self
                .entries
                .get_mut(index)
                .map(|(_, previous)| std::mem::replace(previous, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name)
            .map(|index| self.entries.remove(index).1)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let headers: Headers = [("X-Amzn-Trace-Id", "abc")].into_iter().collect();

        check!(headers.get("x-amzn-trace-id") == Some("abc"));
        check!(headers.contains("X-AMZN-TRACE-ID"));
        check!(headers.get("host").is_none());
    }

    #[test]
    fn insert_replaces_logical_duplicate() {
        let mut headers = Headers::new();
        check!(headers.insert("Host", "a.example.com").is_none());
        let previous = headers.insert("host", "b.example.com");

        check!(previous.as_deref() == Some("a.example.com"));
        check!(headers.len() == 1);
        check!(headers.iter().collect::<Vec<_>>() == vec![("Host", "b.example.com")]);
    }

    #[test]
    fn remove_ignores_case() {
        let mut headers: Headers = [("host", "example.com"), ("Accept", "*/*")]
            .into_iter()
            .collect();

        check!(headers.remove("HOST").as_deref() == Some("example.com"));
        check!(headers.remove("host").is_none());
        check!(headers.len() == 1);
    }

    #[test]
    fn collecting_keeps_last_value() {
        let headers: Headers = [("a", "1"), ("A", "2"), ("b", "3")].into_iter().collect();

        check!(headers.len() == 2);
        check!(headers.get("a") == Some("2"));
    }

    #[test]
    fn debug_as_map() {
        let headers: Headers = [("host", "example.com")].into_iter().collect();
        check!(format!("{headers:?}") == r#"{"host": "example.com"}"#);
    }
}
