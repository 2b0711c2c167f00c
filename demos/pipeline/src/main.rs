//! Pipeline Example
//!
//! Sends one request through the built-in middleware plus a custom one, and
//! prints the resolved order. Run with `RUST_LOG=debug` to see every step.

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use strata::middleware::{HOST_HEADER_MIDDLEWARE, from_fn};
use strata::prelude::*;

#[tokio::main]
async fn main() -> strata::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let user_agent = from_fn(|mut request: Request, next: Next| async move {
        request
            .headers_mut()
            .insert("User-Agent", "strata-pipeline-demo/0.1.0");
        next.run(request).await
    });

    let client = Client::builder()
        .with_defaults()
        .middleware_relative_to(
            Middleware::new("userAgentMiddleware", user_agent),
            Relation::After(HOST_HEADER_MIDDLEWARE.to_owned()),
        )
        .build()?;

    println!("Middleware, outermost first:");
    for line in client.middleware_stack().identify()? {
        println!("  {line}");
    }

    let response = client.get("https://httpbin.org/headers").await?;
    println!("Status: {}", response.status());
    if let Ok(text) = response.text() {
        println!("{text}");
    }

    Ok(())
}
