//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate:
//! one event before the request goes down the stack, one event when the
//! response (or error) comes back up. Results pass through untouched.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use derive_more::Display;
use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::stack::{Middleware, MiddlewareStack, Plugin, Priority, Step};
use crate::{Error, Request, Response, Result};

/// Name of the logging middleware in a stack.
pub const LOGGER_MIDDLEWARE: &str = "loggerMiddleware";

/// Layer that adds request/response logging.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::LoggingLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(LoggingLayer::new())
///     .service(transport);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    #[display("debug")]
    Debug,
    /// Log at info level (summary only).
    #[default]
    #[display("info")]
    Info,
}

impl LoggingLayer {
    /// Create a new logging layer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer at the given level.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Service<Request> for Logging<S>
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

    fn call(&mut self, request: Request) -> Self::Future {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        match level {
            LogLevel::Debug => {
                span.in_scope(|| {
                    debug!(
                        headers = ?request.headers(),
                        body = ?request.body(),
                        "sending request"
                    );
                });
            }
            LogLevel::Info => span.in_scope(|| info!("sending request")),
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(
            async move {
                let start = Instant::now();
                let result = inner.call(request).await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) if response.is_success() => {
                        let status = response.status();
                        match level {
                            LogLevel::Debug => debug!(
                                status,
                                elapsed_ms,
                                headers = ?response.headers(),
                                "request completed"
                            ),
                            LogLevel::Info => info!(status, elapsed_ms, "request completed"),
                        }
                    }
                    Ok(response) => {
                        warn!(
                            status = response.status(),
                            elapsed_ms, "request completed with HTTP error"
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Logging middleware descriptor: step `initialize`, priority `high`, tag `LOGGER`.
///
/// Sitting outermost, it sees the request as the caller built it and the
/// final outcome of the whole chain.
#[must_use]
pub fn logger_middleware(level: LogLevel) -> Middleware {
    Middleware::new(LOGGER_MIDDLEWARE, LoggingLayer::with_level(level))
        .with_step(Step::Initialize)
        .with_priority(Priority::High)
        .with_tag("LOGGER")
}

/// Plugin registering [`logger_middleware`].
#[must_use]
pub fn logger_plugin(level: LogLevel) -> impl Plugin + Send + Sync {
    move |stack: &mut MiddlewareStack| stack.add(logger_middleware(level))
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use tower::ServiceExt;

    use super::*;
    use crate::Method;

    fn request() -> Request {
        Request::builder(Method::Get, "https://example.com/".parse().expect("url")).build()
    }

    #[test]
    fn logging_layer_default() {
        let layer = LoggingLayer::new();
        check!(layer.level == LogLevel::Info);
    }

    #[test]
    fn logging_layer_debug() {
        let layer = LoggingLayer::with_level(LogLevel::Debug);
        check!(layer.level == LogLevel::Debug);
    }

    #[tokio::test]
    async fn error_passes_through_unchanged() {
        let terminal =
            tower::service_fn(|_request: Request| async { Err::<Response, _>(Error::Timeout) });
        let service = LoggingLayer::new().layer(terminal);

        let_assert!(Err(err) = service.oneshot(request()).await);
        check!(err.is_timeout());
    }

    #[tokio::test]
    async fn response_passes_through_unchanged() {
        let terminal = tower::service_fn(|_request: Request| async {
            Ok::<_, Error>(Response::new(404).with_body("missing"))
        });
        let service = LoggingLayer::with_level(LogLevel::Debug).layer(terminal);

        let_assert!(Ok(response) = service.oneshot(request()).await);
        check!(response.status() == 404);
        check!(response.body().as_ref() == b"missing");
    }
}
