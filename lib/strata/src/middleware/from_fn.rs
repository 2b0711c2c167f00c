//! Middleware from async functions.
//!
//! For one-off middleware a full `Layer`/`Service` pair is overkill:
//! [`from_fn`] turns `async fn(Request, Next) -> Result<Response>` into a
//! layer. Call [`Next::run`] to continue down the stack, or return early to
//! short-circuit.
//!
//! # Example
//!
//! ```ignore
//! use strata::middleware::{Next, from_fn};
//! use strata::stack::Middleware;
//!
//! async fn user_agent(mut request: Request, next: Next) -> Result<Response> {
//!     request.headers_mut().insert("User-Agent", "strata");
//!     next.run(request).await
//! }
//!
//! let middleware = Middleware::new("userAgent", from_fn(user_agent));
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service, ServiceExt};

use crate::stack::BoxedService;
use crate::{Error, Request, Response, Result};

/// The rest of the middleware chain, down to the terminal handler.
pub struct Next {
    inner: BoxedService,
}

impl Next {
    /// Sends the request to the next middleware and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns whatever error the inner chain produced.
    pub async fn run(self, request: Request) -> Result<Response> {
        self.inner.oneshot(request).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Creates a layer from an async function.
pub fn from_fn<F, Fut>(f: F) -> FromFnLayer<F>
where
    F: Fn(Request, Next) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FromFnLayer { f }
}

/// Layer built by [`from_fn`].
#[derive(Clone)]
pub struct FromFnLayer<F> {
    f: F,
}

impl<F> fmt::Debug for FromFnLayer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFnLayer").finish_non_exhaustive()
    }
}

impl<F: Clone> Layer<BoxedService> for FromFnLayer<F> {
    type Service = FromFn<F>;

    fn layer(&self, inner: BoxedService) -> Self::Service {
        FromFn {
            f: self.f.clone(),
            inner,
        }
    }
}

/// Service built by [`FromFnLayer`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
    inner: BoxedService,
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

impl<F, Fut> Service<Request> for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // readiness of the inner chain is awaited by `Next::run`
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let next = Next {
            inner: self.inner.clone(),
        };
        Box::pin((self.f)(request, next))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::Method;

    fn request() -> Request {
        Request::builder(Method::Get, "https://example.com/".parse().expect("url")).build()
    }

    fn echo_headers() -> BoxedService {
        BoxedService::new(tower::service_fn(|request: Request| async move {
            let mut response = Response::new(200);
            for (name, value) in request.headers().iter() {
                response.headers_mut().insert(name, value);
            }
            Ok::<_, Error>(response)
        }))
    }

    #[tokio::test]
    async fn mutates_request_and_response() {
        let layer = from_fn(|mut request: Request, next: Next| async move {
            request.headers_mut().insert("X-Request", "1");
            let mut response = next.run(request).await?;
            response.headers_mut().insert("X-Response", "2");
            Ok::<_, Error>(response)
        });

        let_assert!(Ok(response) = layer.layer(echo_headers()).oneshot(request()).await);
        check!(response.header("x-request") == Some("1"));
        check!(response.header("x-response") == Some("2"));
    }

    #[tokio::test]
    async fn short_circuits_without_next() {
        let layer = from_fn(|_request: Request, _next: Next| async move {
            Ok::<_, Error>(Response::new(304))
        });

        let_assert!(Ok(response) = layer.layer(echo_headers()).oneshot(request()).await);
        check!(response.status() == 304);
    }
}
