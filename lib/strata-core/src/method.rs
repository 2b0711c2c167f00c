//! HTTP method types.

use std::str::FromStr;

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method.
    #[display("GET")]
    Get,
    /// POST method.
    #[display("POST")]
    Post,
    /// PUT method.
    #[display("PUT")]
    Put,
    /// DELETE method.
    #[display("DELETE")]
    Delete,
    /// PATCH method.
    #[display("PATCH")]
    Patch,
    /// HEAD method.
    #[display("HEAD")]
    Head,
    /// OPTIONS method.
    #[display("OPTIONS")]
    Options,
}

impl FromStr for Method {
    type Err = crate::Error;

    /// Parses a verb, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => {
                return Err(crate::Error::invalid_request(format!(
                    "unsupported HTTP method: {s}"
                )));
            }
        };
        Ok(method)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Patch => Self::PATCH,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn method_round_trips_through_text() {
        for method in [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Head,
            Method::Options,
        ] {
            let_assert!(Ok(parsed) = method.to_string().parse::<Method>());
            check!(parsed == method);
        }
    }

    #[test]
    fn method_parse_ignores_case() {
        let_assert!(Ok(method) = "post".parse::<Method>());
        check!(method == Method::Post);
    }

    #[test]
    fn method_parse_rejects_unknown_verb() {
        let_assert!(Err(err) = "BREW".parse::<Method>());
        check!(err.to_string() == "invalid request: unsupported HTTP method: BREW");
    }

    #[test]
    fn method_into_http() {
        check!(http::Method::from(Method::Patch) == http::Method::PATCH);
    }
}
