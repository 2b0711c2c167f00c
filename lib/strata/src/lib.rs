//! Phased middleware stack for outbound HTTP requests.
//!
//! Every request runs through a [`stack::MiddlewareStack`]: named middleware
//! ordered by step and priority (or placed next to one another), composed
//! around a terminal handler that performs the I/O. The built-in middleware
//! set the `Host` header, compute `Content-Length`, forward a function trace
//! id and log each request.
//!
//! # Example
//!
//! ```ignore
//! use strata::prelude::*;
//!
//! let client = Client::builder().with_defaults().build()?;
//! let response = client.get("https://example.com").await?;
//! println!("{}", response.status());
//! ```

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
pub mod stack;
mod transport;

// Re-export client types
pub use client::{Client, ClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use transport::HyperTransport;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use strata_core::{
    Body, ContentType, Error, Headers, HttpClient, HttpClientExt, Method, Request, RequestBuilder,
    Response, Result, StreamingBody, from_json, to_json,
};

pub use url;
