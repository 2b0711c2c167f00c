//! HTTP client traits.
//!
//! [`HttpClient`] is the executor-facing seam: the `strata` crate implements
//! it for a client that runs every request through a resolved middleware
//! stack. Implement it directly for mocks.

use std::future::Future;

use crate::{Method, Request, Response, Result};

/// Core HTTP client trait.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if any middleware or the transport fails:
    /// - Stack errors (unsupported body types)
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Extension trait for [`HttpClient`] with convenience methods.
pub trait HttpClientExt: HttpClient {
    /// Execute a GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the request fails.
    fn get(&self, url: &str) -> impl Future<Output = Result<Response>> + Send {
        async move {
            let url = url::Url::parse(url)?;
            self.execute(Request::builder(Method::Get, url).build())
                .await
        }
    }

    /// Execute a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the request fails.
    fn post_json<T: serde::Serialize + Send + Sync>(
        &self,
        url: &str,
        body: &T,
    ) -> impl Future<Output = Result<Response>> + Send {
        async move {
            let url = url::Url::parse(url)?;
            let request = Request::builder(Method::Post, url).json(body)?.build();
            self.execute(request).await
        }
    }
}

// Blanket implementation for all HttpClient implementors
impl<T: HttpClient> HttpClientExt for T {}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    struct Echo;

    impl HttpClient for Echo {
        async fn execute(&self, request: Request) -> Result<Response> {
            Ok(Response::new(200)
                .with_header("X-Method", request.method().to_string())
                .with_header("X-Url", request.url().as_str()))
        }
    }

    #[tokio::test]
    async fn get_builds_request() {
        let_assert!(Ok(response) = Echo.get("https://example.com/ping").await);
        check!(response.header("x-method") == Some("GET"));
        check!(response.header("x-url") == Some("https://example.com/ping"));
    }

    #[tokio::test]
    async fn invalid_url_is_reported() {
        let_assert!(Err(err) = Echo.get("not a url").await);
        check!(matches!(err, crate::Error::InvalidUrl(_)));
    }
}
