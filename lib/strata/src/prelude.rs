//! Prelude module for convenient imports.
//!
//! ```ignore
//! use strata::prelude::*;
//! ```

pub use crate::middleware::{Next, from_fn};
pub use crate::stack::{Middleware, MiddlewareStack, Plugin, Priority, Relation, Step};
pub use crate::{
    Body, Client, ClientConfig, Error, Headers, HttpClient, HttpClientExt, Method, Request,
    RequestBuilder, Response, Result,
};
