//! Recursion detection.
//!
//! When code runs inside a serverless function and calls out to another
//! service, the function's trace id is forwarded in `X-Amzn-Trace-Id` so the
//! downstream side can spot a function that ends up invoking itself.
//!
//! The execution environment is passed in explicitly: nothing reads the
//! process environment while a request is in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::stack::{Middleware, MiddlewareStack, Plugin, Priority, Step};
use crate::{Error, Request, Response, Result};

/// Name of the recursion detection middleware in a stack.
pub const RECURSION_DETECTION_MIDDLEWARE: &str = "recursionDetectionMiddleware";

/// Header carrying the trace id.
pub const TRACE_ID_HEADER: &str = "X-Amzn-Trace-Id";

/// Environment variable naming the running function.
pub const ENV_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";

/// Environment variable holding the current trace id.
pub const ENV_TRACE_ID: &str = "_X_AMZN_TRACE_ID";

/// Values describing the function execution the process runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    /// Name of the running function.
    pub function_name: Option<String>,
    /// Trace id of the current invocation.
    pub trace_id: Option<String>,
}

impl ExecutionEnvironment {
    /// Create an environment from explicit values.
    #[must_use]
    pub fn new(function_name: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            function_name: Some(function_name.into()),
            trace_id: Some(trace_id.into()),
        }
    }

    /// Reads [`ENV_FUNCTION_NAME`] and [`ENV_TRACE_ID`] once.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            function_name: std::env::var(ENV_FUNCTION_NAME).ok(),
            trace_id: std::env::var(ENV_TRACE_ID).ok(),
        }
    }

    /// The trace id to forward, when both values are non-empty.
    fn forwarded_trace_id(&self) -> Option<&str> {
        let function_name = self.function_name.as_deref().filter(|name| !name.is_empty());
        let trace_id = self.trace_id.as_deref().filter(|id| !id.is_empty());
        function_name.and(trace_id)
    }
}

/// Configuration of the recursion detection middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecursionDetectionConfig {
    /// The process runs as a server-side function.
    pub server_context: bool,
    /// Function name and trace id of the current execution.
    pub environment: ExecutionEnvironment,
}

/// Adds `X-Amzn-Trace-Id` when running in a function and no trace header is set.
///
/// Does nothing outside a server context, when the request already carries
/// the header (in any case), or when either environment value is missing
/// or empty.
pub fn apply_recursion_detection(request: &mut Request, config: &RecursionDetectionConfig) {
    if !config.server_context || request.headers().contains(TRACE_ID_HEADER) {
        return;
    }
    if let Some(trace_id) = config.environment.forwarded_trace_id() {
        request.headers_mut().insert(TRACE_ID_HEADER, trace_id);
    }
}

/// Layer that forwards the function trace id.
#[derive(Debug, Clone, Default)]
pub struct RecursionDetectionLayer {
    config: Arc<RecursionDetectionConfig>,
}

impl RecursionDetectionLayer {
    /// Create a recursion detection layer.
    #[must_use]
    pub fn new(config: RecursionDetectionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for RecursionDetectionLayer {
    type Service = RecursionDetection<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecursionDetection {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service that forwards the function trace id.
#[derive(Debug, Clone)]
pub struct RecursionDetection<S> {
    inner: S,
    config: Arc<RecursionDetectionConfig>,
}

impl<S> Service<Request> for RecursionDetection<S>
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
        apply_recursion_detection(&mut request, &self.config);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}

/// Recursion detection middleware descriptor: step `build`, priority `low`,
/// tag `RECURSION_DETECTION`.
#[must_use]
pub fn recursion_detection_middleware(config: RecursionDetectionConfig) -> Middleware {
    Middleware::new(
        RECURSION_DETECTION_MIDDLEWARE,
        RecursionDetectionLayer::new(config),
    )
    .with_step(Step::Build)
    .with_priority(Priority::Low)
    .with_tag("RECURSION_DETECTION")
}

/// Plugin registering [`recursion_detection_middleware`].
#[must_use]
pub fn recursion_detection_plugin(config: RecursionDetectionConfig) -> impl Plugin + Send + Sync {
    move |stack: &mut MiddlewareStack| stack.add(recursion_detection_middleware(config.clone()))
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;
    use crate::Method;

    fn request() -> Request {
        Request::builder(Method::Get, "https://example.com/".parse().expect("url")).build()
    }

    fn in_function(function_name: &str, trace_id: &str) -> RecursionDetectionConfig {
        RecursionDetectionConfig {
            server_context: true,
            environment: ExecutionEnvironment::new(function_name, trace_id),
        }
    }

    #[test]
    fn forwards_trace_id() {
        let mut request = request();
        apply_recursion_detection(&mut request, &in_function("fn", "abc"));

        check!(request.header("X-Amzn-Trace-Id") == Some("abc"));
    }

    #[test]
    fn existing_trace_header_is_untouched() {
        let mut request = request();
        request.headers_mut().insert("x-amzn-trace-id", "upstream");
        apply_recursion_detection(&mut request, &in_function("fn", "abc"));

        check!(request.headers().len() == 1);
        check!(request.header(TRACE_ID_HEADER) == Some("upstream"));
    }

    #[test]
    fn outside_server_context_does_nothing() {
        let mut request = request();
        let config = RecursionDetectionConfig {
            server_context: false,
            ..in_function("fn", "abc")
        };
        apply_recursion_detection(&mut request, &config);

        check!(request.headers().is_empty());
    }

    #[test]
    fn empty_or_missing_values_do_nothing() {
        for environment in [
            ExecutionEnvironment::new("", "abc"),
            ExecutionEnvironment::new("fn", ""),
            ExecutionEnvironment {
                function_name: Some("fn".into()),
                trace_id: None,
            },
            ExecutionEnvironment::default(),
        ] {
            let mut request = request();
            let config = RecursionDetectionConfig {
                server_context: true,
                environment,
            };
            apply_recursion_detection(&mut request, &config);

            check!(request.headers().is_empty());
        }
    }
}
