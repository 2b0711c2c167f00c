//! Prelude module for convenient imports.
//!
//! ```ignore
//! use strata_core::prelude::*;
//! ```

pub use crate::{
    Body, ContentType, Error, Headers, HttpClient, HttpClientExt, Method, Request, RequestBuilder,
    Response, Result, from_json, to_json,
};
