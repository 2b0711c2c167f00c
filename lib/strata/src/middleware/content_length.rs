//! Content-Length calculation.
//!
//! Sets `Content-Length` on requests whose body length is known up front.
//! Streaming bodies have no length: they must be sent with
//! `Transfer-Encoding: chunked`, otherwise the request is rejected with
//! [`Error::UnsupportedBodyType`].

use std::future::{self, Future};
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::stack::{Middleware, MiddlewareStack, Plugin, Priority, Step};
use crate::{Error, Headers, Request, Response, Result};

/// Name of the content length middleware in a stack.
pub const CONTENT_LENGTH_MIDDLEWARE: &str = "contentLengthMiddleware";

const CONTENT_LENGTH: &str = "Content-Length";
const TRANSFER_ENCODING: &str = "Transfer-Encoding";

fn is_chunked(headers: &Headers) -> bool {
    headers.get(TRANSFER_ENCODING).is_some_and(|value| {
        value
            .split(',')
            .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    })
}

/// Sets `Content-Length` from the body when the header is missing.
///
/// # Errors
///
/// Returns [`Error::UnsupportedBodyType`] for a streaming body without
/// `Transfer-Encoding: chunked`, or the serialization error of a JSON body.
pub fn apply_content_length(request: &mut Request) -> Result<()> {
    if request.headers().contains(CONTENT_LENGTH) {
        return Ok(());
    }
    let Some(body) = request.body() else {
        return Ok(());
    };

    match body.exact_len()? {
        Some(len) => {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, len.to_string());
        }
        None if is_chunked(request.headers()) => {}
        None => {
            return Err(Error::unsupported_body_type(
                "streaming body length is unknown, send it with `Transfer-Encoding: chunked`",
            ));
        }
    }
    Ok(())
}

/// Layer that computes the `Content-Length` header.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::ContentLengthLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(ContentLengthLayer::new())
///     .service(transport);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentLengthLayer;

impl ContentLengthLayer {
    /// Create a new content length layer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ContentLengthLayer {
    type Service = ContentLength<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContentLength { inner }
    }
}

/// Service that computes the `Content-Length` header.
#[derive(Debug, Clone)]
pub struct ContentLength<S> {
    inner: S,
}

impl<S> Service<Request> for ContentLength<S>
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
        if let Err(err) = apply_content_length(&mut request) {
            return Box::pin(future::ready(Err(err)));
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}

/// Content length middleware descriptor: step `build`, tags
/// `SET_CONTENT_LENGTH` and `CONTENT_LENGTH`.
#[must_use]
pub fn content_length_middleware() -> Middleware {
    Middleware::new(CONTENT_LENGTH_MIDDLEWARE, ContentLengthLayer::new())
        .with_step(Step::Build)
        .with_priority(Priority::Normal)
        .with_tag("SET_CONTENT_LENGTH")
        .with_tag("CONTENT_LENGTH")
}

/// Plugin registering [`content_length_middleware`].
#[must_use]
pub fn content_length_plugin() -> impl Plugin + Send + Sync {
    |stack: &mut MiddlewareStack| stack.add(content_length_middleware())
}
