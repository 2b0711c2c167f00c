//! HTTP responses.
//!
//! [`Response`] is what the terminal handler hands back and what unwinds
//! through the middleware stack on the way out.
//!
//! # Example
//!
//! ```
//! use strata_core::Response;
//!
//! let response = Response::new(200)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body("pong");
//!
//! assert!(response.is_success());
//! assert_eq!(response.header("content-type"), Some("text/plain"));
//! ```

use bytes::Bytes;

use crate::Headers;

/// HTTP response with status, headers, and a buffered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self::from_parts(status, Headers::new(), Bytes::new())
    }

    /// Creates a response from its parts.
    #[must_use]
    pub fn from_parts(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers, for middleware post-processing.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Single header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn response_basic() {
        let response = Response::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"id":1}"#);

        check!(response.status() == 200);
        check!(response.header("content-type") == Some("application/json"));
        check!(response.is_success());
        check!(!response.is_client_error());
        check!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        check!(Response::new(301).is_redirection());
        check!(Response::new(404).is_client_error());
        check!(Response::new(503).is_server_error());
    }

    #[test]
    fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Pong {
            seq: u32,
        }

        let response = Response::new(200).with_body(r#"{"seq":7}"#);
        let_assert!(Ok(pong) = response.json::<Pong>());
        check!(pong == Pong { seq: 7 });
    }

    #[test]
    fn response_text() {
        let response = Response::new(200).with_body(Bytes::from_static(b"pong"));
        check!(response.text() == Ok("pong"));

        let response = Response::new(200).with_body(vec![0xff, 0xfe]);
        check!(response.text().is_err());
    }
}
