//! Outgoing HTTP requests.
//!
//! A [`Request`] is the mutable context that travels through the middleware
//! stack: every layer may read or rewrite its headers and body before
//! handing it to the next one.
//!
//! # Example
//!
//! ```
//! use strata_core::{Method, Request};
//!
//! let request = Request::builder(Method::Post, "https://example.com:8443/ping".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .body("ping")
//!     .build();
//!
//! assert_eq!(request.hostname(), Some("example.com"));
//! assert_eq!(request.authority().as_deref(), Some("example.com:8443"));
//! ```

use crate::{Body, ContentType, Headers, Method};

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Option<Body>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Reassembles a request from its parts.
    #[must_use]
    pub fn from_parts(method: Method, url: url::Url, headers: Headers, body: Option<Body>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Target host name, without port.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Explicit port, `None` when the URL uses its scheme's default.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// `hostname[:port]`, the value of a `host` or `:authority` header.
    #[must_use]
    pub fn authority(&self) -> Option<String> {
        let hostname = self.hostname()?;
        Some(match self.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_owned(),
        })
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Single header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Replaces the body, returning the previous one.
    pub fn set_body(&mut self, body: impl Into<Body>) -> Option<Body> {
        self.body.replace(body.into())
    }

    /// Takes the body out, leaving the request without one.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, Headers, Option<Body>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Option<Body>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any header with the same name in another case.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a plain text body.
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.header("Content-Type", ContentType::PlainText.as_str())
            .body(Body::Text(text.into()))
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self
            .header("Content-Type", ContentType::Json.as_str())
            .body(Body::Json(value)))
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}
