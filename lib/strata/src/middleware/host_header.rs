//! Host header injection.
//!
//! Fills in the `host` header (or the `:authority` pseudo-header for HTTP/2)
//! from the request URL when the caller did not set one.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use derive_more::Display;
use tower::{Layer, Service};

use crate::stack::{Middleware, MiddlewareStack, Plugin, Priority, Step};
use crate::{Error, Request, Response, Result};

/// Name of the host header middleware in a stack.
pub const HOST_HEADER_MIDDLEWARE: &str = "hostHeaderMiddleware";

/// Wire protocol the transport speaks, which decides the header to set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Protocol {
    /// HTTP/1.x: `host`.
    #[default]
    #[display("http/1.1")]
    Http1,
    /// HTTP/2: `:authority`.
    #[display("h2")]
    Http2,
}

/// Sets `host` (HTTP/1) or `:authority` (HTTP/2) to `hostname[:port]`.
///
/// An existing header is kept. Under HTTP/2 any `host` header is dropped in
/// favor of `:authority`. Applying it twice is the same as applying it once.
pub fn apply_host_header(request: &mut Request, protocol: Protocol) {
    let Some(authority) = request.authority() else {
        return;
    };

    let headers = request.headers_mut();
    match protocol {
        Protocol::Http1 => {
            if !headers.contains("host") {
                headers.insert("host", authority);
            }
        }
        Protocol::Http2 => {
            // h2 carries the authority as a pseudo-header only
            headers.remove("host");
            if !headers.contains(":authority") {
                headers.insert(":authority", authority);
            }
        }
    }
}

/// Layer that injects the host header.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::{HostHeaderLayer, Protocol};
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(HostHeaderLayer::new(Protocol::Http2))
///     .service(transport);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HostHeaderLayer {
    protocol: Protocol,
}

impl HostHeaderLayer {
    /// Create a host header layer for the given protocol.
    #[must_use]
    pub const fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

impl<S> Layer<S> for HostHeaderLayer {
    type Service = HostHeader<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HostHeader {
            inner,
            protocol: self.protocol,
        }
    }
}

/// Service that injects the host header.
#[derive(Debug, Clone)]
pub struct HostHeader<S> {
    inner: S,
    protocol: Protocol,
}

impl<S> Service<Request> for HostHeader<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        apply_host_header(&mut request, self.protocol);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}

/// Host header middleware descriptor: step `build`, priority `low`, tag `HOST`.
#[must_use]
pub fn host_header_middleware(protocol: Protocol) -> Middleware {
    Middleware::new(HOST_HEADER_MIDDLEWARE, HostHeaderLayer::new(protocol))
        .with_step(Step::Build)
        .with_priority(Priority::Low)
        .with_tag("HOST")
}

/// Plugin registering [`host_header_middleware`].
#[must_use]
pub fn host_header_plugin(protocol: Protocol) -> impl Plugin + Send + Sync {
    move |stack: &mut MiddlewareStack| stack.add(host_header_middleware(protocol))
}
