//! Built-in middleware.
//!
//! Each middleware comes as a Tower [`Layer`]/`Service` pair usable on its
//! own, a `*_middleware()` function returning a ready [`Middleware`]
//! descriptor with its conventional name, step, priority and tags, and a
//! `*_plugin()` function registering that descriptor.
//!
//! | Middleware | Name | Step | Priority |
//! |------------|------|------|----------|
//! | [`LoggingLayer`] | `loggerMiddleware` | initialize | high |
//! | [`ContentLengthLayer`] | `contentLengthMiddleware` | build | normal |
//! | [`HostHeaderLayer`] | `hostHeaderMiddleware` | build | low |
//! | [`RecursionDetectionLayer`] | `recursionDetectionMiddleware` | build | low |
//!
//! [`from_fn`] builds ad-hoc middleware from an async function.
//!
//! [`Middleware`]: crate::stack::Middleware

mod content_length;
mod from_fn;
mod host_header;
mod logging;
mod recursion_detection;

pub use content_length::{
    CONTENT_LENGTH_MIDDLEWARE, ContentLength, ContentLengthLayer, apply_content_length,
    content_length_middleware, content_length_plugin,
};
pub use from_fn::{FromFn, FromFnLayer, Next, from_fn};
pub use host_header::{
    HOST_HEADER_MIDDLEWARE, HostHeader, HostHeaderLayer, Protocol, apply_host_header,
    host_header_middleware, host_header_plugin,
};
pub use logging::{LOGGER_MIDDLEWARE, LogLevel, Logging, LoggingLayer, logger_middleware, logger_plugin};
pub use recursion_detection::{
    ENV_FUNCTION_NAME, ENV_TRACE_ID, ExecutionEnvironment, RECURSION_DETECTION_MIDDLEWARE,
    RecursionDetection, RecursionDetectionConfig, RecursionDetectionLayer, TRACE_ID_HEADER,
    apply_recursion_detection, recursion_detection_middleware, recursion_detection_plugin,
};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
