//! Error types for strata.

use derive_more::{Display, Error, From};

/// Main error type for stack construction and request execution.
///
/// Errors raised by the terminal handler travel unchanged through every
/// middleware layer back to the caller.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// A middleware with the same name is already registered.
    #[display("duplicate middleware name '{name}'")]
    #[from(skip)]
    DuplicateMiddleware {
        /// Name of the colliding middleware.
        #[error(not(source))]
        name: String,
    },

    /// A relative middleware points at a name that is not in the stack.
    #[display("middleware '{name}' not found")]
    #[from(skip)]
    MiddlewareNotFound {
        /// Name that could not be resolved.
        #[error(not(source))]
        name: String,
    },

    /// The request body length cannot be determined up front.
    #[display("unsupported body type: {_0}")]
    #[from(skip)]
    UnsupportedBodyType(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a duplicate middleware error.
    #[must_use]
    pub fn duplicate_middleware(name: impl Into<String>) -> Self {
        Self::DuplicateMiddleware { name: name.into() }
    }

    /// Create a middleware not found error.
    #[must_use]
    pub fn middleware_not_found(name: impl Into<String>) -> Self {
        Self::MiddlewareNotFound { name: name.into() }
    }

    /// Create an unsupported body type error.
    #[must_use]
    pub fn unsupported_body_type(message: impl Into<String>) -> Self {
        Self::UnsupportedBodyType(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the error comes from building the middleware stack
    /// rather than from running a request.
    #[must_use]
    pub const fn is_stack(&self) -> bool {
        matches!(
            self,
            Self::DuplicateMiddleware { .. } | Self::MiddlewareNotFound { .. }
        )
    }
}
