//! Terminal handler: the hyper-based HTTP transport.
//!
//! [`HyperTransport`] is the innermost service of a resolved stack. It owns
//! its connection pool; cloning a transport shares the pool, so several
//! clients can reuse connections without any process-wide cache.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use http_body::Frame;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower_service::Service;
use tracing::trace;

use crate::{
    Body, Error, Headers, Request, Response, Result, config::ClientConfig,
    connector::https_connector, middleware::Protocol,
};

type TransportBody = UnsyncBoxBody<Bytes, Error>;

/// HTTP transport using hyper-util with connection pooling and TLS.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, TransportBody>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with its own connection pool.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let connector = https_connector(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .http2_only(config.protocol == Protocol::Http2)
            .build(connector);

        Self {
            inner,
            config: config.clone(),
        }
    }

    fn full(bytes: Bytes) -> TransportBody {
        Full::new(bytes)
            .map_err(|never| match never {})
            .boxed_unsync()
    }

    /// Convert a request body to a hyper body. Streams are sent as they come.
    fn transport_body(body: Option<Body>) -> Result<TransportBody> {
        Ok(match body {
            None => Empty::new().map_err(|never| match never {}).boxed_unsync(),
            Some(Body::Bytes(bytes)) => Self::full(bytes),
            Some(Body::Text(text)) => Self::full(Bytes::from(text)),
            Some(Body::Json(value)) => Self::full(crate::to_json(&value)?),
            Some(Body::Stream(stream)) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        })
    }

    /// Build a hyper request from a strata request.
    fn build_hyper_request(request: Request) -> Result<http::Request<TransportBody>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in headers {
            // pseudo-headers are derived from the URI by hyper
            if name.starts_with(':') {
                trace!(%name, "skipping pseudo-header");
                continue;
            }
            builder = builder.header(name, value);
        }

        builder
            .body(Self::transport_body(body)?)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers, skipping values that are not valid UTF-8.
    fn extract_headers(headers: &http::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = tokio::time::timeout(self.config.timeout, self.inner.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::from_parts(status, response_headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<Request> for HyperTransport {
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use futures_util::stream;

    use super::*;
    use crate::Method;

    #[test]
    fn pseudo_headers_are_not_forwarded() {
        let request = Request::builder(Method::Get, "https://example.com/".parse().expect("url"))
            .header(":authority", "example.com")
            .header("Accept", "*/*")
            .build();

        let_assert!(Ok(hyper_request) = HyperTransport::build_hyper_request(request));
        check!(hyper_request.headers().len() == 1);
        check!(hyper_request.headers().contains_key("accept"));
        check!(hyper_request.uri() == "https://example.com/");
    }

    #[tokio::test]
    async fn buffered_and_streamed_bodies_carry_the_same_bytes() {
        let_assert!(Ok(text) = HyperTransport::transport_body(Some(Body::from("ping"))));
        let_assert!(Ok(collected) = text.collect().await);
        check!(collected.to_bytes().as_ref() == b"ping");

        let chunks = Body::stream(stream::iter(vec![
            Ok(Bytes::from_static(b"pi")),
            Ok(Bytes::from_static(b"ng")),
        ]));
        let_assert!(Ok(streamed) = HyperTransport::transport_body(Some(chunks)));
        let_assert!(Ok(collected) = streamed.collect().await);
        check!(collected.to_bytes().as_ref() == b"ping");
    }

    #[test]
    fn transport_is_debug() {
        let transport = HyperTransport::new(&ClientConfig::default());
        check!(format!("{transport:?}").contains("HyperTransport"));
    }
}
