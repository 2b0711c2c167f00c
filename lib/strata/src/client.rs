//! HTTP client running every request through a resolved middleware stack.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tower::ServiceExt;
use tower_service::Service;
use tracing::debug;

use crate::{
    Error, Request, Response, Result,
    config::{ClientConfig, ClientConfigBuilder},
    middleware::{
        CONTENT_LENGTH_MIDDLEWARE, ExecutionEnvironment, HOST_HEADER_MIDDLEWARE, LOGGER_MIDDLEWARE,
        LogLevel, Protocol, RECURSION_DETECTION_MIDDLEWARE, RecursionDetectionConfig,
        content_length_plugin, host_header_plugin, logger_plugin, recursion_detection_plugin,
    },
    stack::{BoxedService, Middleware, MiddlewareStack, Plugin, Relation},
    transport::HyperTransport,
};

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// The mutex only guards the clone taken for each call, which makes the
/// client `Sync` as required by [`crate::HttpClient`].
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        // readiness of the whole chain is driven here, once per call
        Box::pin(service.oneshot(request))
    }
}

/// HTTP client with a resolved middleware stack.
///
/// # Example
///
/// ```ignore
/// use strata::Client;
///
/// let client = Client::builder().with_defaults().build()?;
/// let response = client.get("https://example.com").await?;
/// ```
#[derive(Clone)]
pub struct Client {
    service: SyncService,
    config: ClientConfig,
    stack: MiddlewareStack,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default configuration and the built-in middleware.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in stack cannot be resolved.
    pub fn new() -> Result<Self> {
        Self::builder().with_defaults().build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The stack this client was resolved from.
    #[must_use]
    pub const fn middleware_stack(&self) -> &MiddlewareStack {
        &self.stack
    }
}

impl strata_core::HttpClient for Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }
}

impl Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // the resolved chain is polled for readiness when called
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`Client`].
///
/// Middleware is collected into a [`MiddlewareStack`]: the base stack first,
/// then the built-ins when [`ClientBuilder::with_defaults`] is set, then
/// single middleware, then plugins. The stack is resolved once by
/// [`ClientBuilder::build`].
///
/// # Example
///
/// ```ignore
/// use strata::Client;
/// use strata::middleware::from_fn;
/// use strata::stack::{Middleware, Step};
///
/// let client = Client::builder()
///     .with_defaults()
///     .middleware(
///         Middleware::new("userAgent", from_fn(|mut request, next| async move {
///             request.headers_mut().insert("User-Agent", "strata");
///             next.run(request).await
///         }))
///         .with_step(Step::Build),
///     )
///     .build()?;
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    environment: Option<ExecutionEnvironment>,
    stack: MiddlewareStack,
    middleware: Vec<(Middleware, Option<Relation>)>,
    plugins: Vec<Box<dyn Plugin + Send + Sync>>,
    use_defaults: bool,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("environment", &self.environment)
            .field("stack", &self.stack)
            .field("middleware_count", &self.middleware.len())
            .field("plugins_count", &self.plugins.len())
            .field("use_defaults", &self.use_defaults)
            .finish()
    }
}

impl ClientBuilder {
    /// Set the request timeout (applied by the transport).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the transport protocol.
    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config = self.config.protocol(protocol);
        self
    }

    /// Mark the process as running inside a server-side function.
    #[must_use]
    pub fn server_context(mut self, server_context: bool) -> Self {
        self.config = self.config.server_context(server_context);
        self
    }

    /// Set the logging middleware level.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config = self.config.log_level(level);
        self
    }

    /// Use explicit execution environment values instead of reading the
    /// process environment.
    #[must_use]
    pub fn execution_environment(mut self, environment: ExecutionEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Start from an existing stack.
    #[must_use]
    pub fn stack(mut self, stack: MiddlewareStack) -> Self {
        self.stack = stack;
        self
    }

    /// Add a middleware placed by its step and priority.
    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push((middleware, None));
        self
    }

    /// Add a middleware placed next to another one.
    #[must_use]
    pub fn middleware_relative_to(mut self, middleware: Middleware, relation: Relation) -> Self {
        self.middleware.push((middleware, Some(relation)));
        self
    }

    /// Apply a plugin to the stack when building.
    #[must_use]
    pub fn plugin(mut self, plugin: impl Plugin + Send + Sync + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Install the built-in middleware.
    ///
    /// Adds logging, host header, content length and recursion detection,
    /// configured from the client configuration. A built-in whose name is
    /// already in the base stack is left alone.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.use_defaults = true;
        self
    }

    /// Disable the built-in middleware.
    #[must_use]
    pub fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }

    /// Build the client over a [`HyperTransport`].
    ///
    /// # Errors
    ///
    /// Returns a stack error when two middleware share a name or a relative
    /// middleware's anchor is missing.
    pub fn build(self) -> Result<Client> {
        let config = self.config.clone().build();
        let transport = HyperTransport::new(&config);
        self.build_with(transport)
    }

    /// Build the client over a custom terminal handler.
    ///
    /// # Errors
    ///
    /// Same as [`ClientBuilder::build`].
    pub fn build_with<S>(self, terminal: S) -> Result<Client>
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        let config = self.config.build();
        let mut stack = self.stack;

        if self.use_defaults {
            let environment = self
                .environment
                .unwrap_or_else(ExecutionEnvironment::from_env);
            install_defaults(&mut stack, &config, environment)?;
        }

        for (middleware, relation) in self.middleware {
            match relation {
                Some(relation) => stack.add_relative_to(middleware, relation)?,
                None => stack.add(middleware)?,
            }
        }

        for plugin in &self.plugins {
            stack.use_plugin(plugin.as_ref())?;
        }

        let service = stack.resolve(terminal)?;
        debug!(middleware = stack.len(), "client built");

        Ok(Client {
            service: SyncService::new(service),
            config,
            stack,
        })
    }
}

fn install_defaults(
    stack: &mut MiddlewareStack,
    config: &ClientConfig,
    environment: ExecutionEnvironment,
) -> Result<()> {
    if !stack.contains(LOGGER_MIDDLEWARE) {
        stack.use_plugin(&logger_plugin(config.log_level))?;
    }
    if !stack.contains(HOST_HEADER_MIDDLEWARE) {
        stack.use_plugin(&host_header_plugin(config.protocol))?;
    }
    if !stack.contains(CONTENT_LENGTH_MIDDLEWARE) {
        stack.use_plugin(&content_length_plugin())?;
    }
    if !stack.contains(RECURSION_DETECTION_MIDDLEWARE) {
        stack.use_plugin(&recursion_detection_plugin(RecursionDetectionConfig {
            server_context: config.server_context,
            environment,
        }))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;
    use tower::service_fn;

    use super::*;
    use crate::HttpClient;
    use crate::Method;
    use crate::middleware::{TRACE_ID_HEADER, from_fn};
    use crate::stack::Step;

    /// Echoes the request headers back as response headers.
    async fn echo(request: Request) -> Result<Response> {
        let (_, _, headers, body) = request.into_parts();
        let body = match body {
            Some(body) => body.collect().await?,
            None => Bytes::new(),
        };
        Ok(Response::from_parts(200, headers, body))
    }

    fn post(url: &str, body: &str) -> Request {
        let_assert!(Ok(url) = url.parse());
        Request::builder(Method::Post, url).text(body).build()
    }

    #[test]
    fn client_builder_config() {
        let_assert!(
            Ok(client) = Client::builder()
                .timeout(Duration::from_secs(60))
                .pool_idle_per_host(16)
                .build_with(service_fn(echo))
        );
        check!(client.config().timeout == Duration::from_secs(60));
        check!(client.config().pool_idle_per_host == 16);
        check!(client.middleware_stack().is_empty());
    }

    #[test]
    fn defaults_are_ordered_by_step_and_priority() {
        let_assert!(
            Ok(client) = Client::builder()
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .build_with(service_fn(echo))
        );
        let_assert!(Ok(order) = client.middleware_stack().identify());
        check!(
            order
                == [
                    "loggerMiddleware - initialize",
                    "contentLengthMiddleware - build",
                    "hostHeaderMiddleware - build",
                    "recursionDetectionMiddleware - build",
                ]
        );
    }

    #[tokio::test]
    async fn defaults_set_host_and_content_length() {
        let_assert!(
            Ok(client) = Client::builder()
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .build_with(service_fn(echo))
        );

        let_assert!(Ok(response) = client.execute(post("https://example.com/ping", "ping")).await);
        check!(response.header("host") == Some("example.com"));
        check!(response.header("content-length") == Some("4"));
        check!(response.header(TRACE_ID_HEADER).is_none());
    }

    #[tokio::test]
    async fn server_context_forwards_trace_id() {
        let_assert!(
            Ok(client) = Client::builder()
                .with_defaults()
                .server_context(true)
                .execution_environment(ExecutionEnvironment::new("handler", "Root=1-abc"))
                .build_with(service_fn(echo))
        );

        let_assert!(Ok(response) = client.execute(post("https://example.com/", "")).await);
        check!(response.header(TRACE_ID_HEADER) == Some("Root=1-abc"));
    }

    #[tokio::test]
    async fn custom_middleware_sees_default_headers() {
        let seen_host = from_fn(|request: Request, next| async move {
            let host = request.header("host").map(str::to_owned);
            let mut response = next.run(request).await?;
            if let Some(host) = host {
                response.headers_mut().insert("x-seen-host", host);
            }
            Ok::<_, Error>(response)
        });

        let_assert!(
            Ok(client) = Client::builder()
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .middleware_relative_to(
                    Middleware::new("seenHost", seen_host),
                    Relation::After(HOST_HEADER_MIDDLEWARE.to_owned()),
                )
                .build_with(service_fn(echo))
        );

        let_assert!(Ok(response) = client.execute(post("https://example.com/", "")).await);
        check!(response.header("x-seen-host") == Some("example.com"));
    }

    #[test]
    fn default_in_base_stack_is_kept() {
        let mut stack = MiddlewareStack::new();
        let_assert!(Ok(()) = stack.use_plugin(&logger_plugin(LogLevel::Debug)));

        let_assert!(
            Ok(client) = Client::builder()
                .stack(stack)
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .build_with(service_fn(echo))
        );
        check!(client.middleware_stack().len() == 4);
    }

    #[test]
    fn duplicate_middleware_fails_build() {
        let_assert!(
            Err(err) = Client::builder()
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .middleware(
                    Middleware::new(LOGGER_MIDDLEWARE, tower::layer::util::Identity::new())
                        .with_step(Step::Build)
                )
                .build_with(service_fn(echo))
        );
        check!(matches!(err, Error::DuplicateMiddleware { .. }));
    }

    /// Fails any call that was not preceded by a successful `poll_ready`.
    #[derive(Clone)]
    struct RequireReady {
        inner: BoxedService,
        ready: bool,
    }

    impl Service<Request> for RequireReady {
        type Response = Response;
        type Error = Error;
        type Future = ServiceFuture;

        fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
            let poll = self.inner.poll_ready(cx);
            if let Poll::Ready(Ok(())) = poll {
                self.ready = true;
            }
            poll
        }

        fn call(&mut self, request: Request) -> Self::Future {
            if !std::mem::take(&mut self.ready) {
                return Box::pin(std::future::ready(Err(Error::invalid_request(
                    "called before poll_ready",
                ))));
            }
            let clone = self.inner.clone();
            let mut inner = std::mem::replace(&mut self.inner, clone);
            Box::pin(async move { inner.call(request).await })
        }
    }

    fn require_ready() -> Middleware {
        Middleware::new(
            "requireReady",
            tower::layer::layer_fn(|inner| RequireReady {
                inner,
                ready: false,
            }),
        )
        .with_step(Step::Build)
    }

    #[tokio::test]
    async fn readiness_is_driven_before_each_call() {
        let_assert!(
            Ok(client) = Client::builder()
                .with_defaults()
                .execution_environment(ExecutionEnvironment::default())
                .middleware(require_ready())
                .build_with(service_fn(echo))
        );

        let_assert!(Ok(first) = client.execute(post("https://example.com/", "one")).await);
        check!(first.status() == 200);
        let_assert!(Ok(second) = client.execute(post("https://example.com/", "two")).await);
        check!(second.body().as_ref() == b"two");
    }

    #[tokio::test]
    async fn tower_call_path_drives_readiness() {
        let_assert!(
            Ok(client) = Client::builder()
                .middleware(require_ready())
                .build_with(service_fn(echo))
        );

        let_assert!(Ok(response) = client.oneshot(post("https://example.com/", "ping")).await);
        check!(response.status() == 200);
    }

    #[test]
    fn missing_anchor_fails_build() {
        let_assert!(
            Err(err) = Client::builder()
                .middleware_relative_to(
                    Middleware::new("late", tower::layer::util::Identity::new()),
                    Relation::After("missing".to_owned()),
                )
                .build_with(service_fn(echo))
        );
        check!(matches!(err, Error::MiddlewareNotFound { .. }));
    }
}
