//! Core types for the strata middleware stack.
//!
//! This crate provides the transport-agnostic data model shared by every
//! middleware:
//! - [`Method`] - HTTP method enum
//! - [`Headers`] - case-insensitive header map
//! - [`Body`] - request payloads, buffered or streamed
//! - [`Request`] and [`RequestBuilder`] - the in-flight request context
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution

mod body;
mod client;
mod error;
mod headers;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{Body, ContentType, StreamingBody, from_json, to_json};
pub use client::{HttpClient, HttpClientExt};
pub use error::{Error, Result};
pub use headers::Headers;
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;
