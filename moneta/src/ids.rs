//! Request identifiers
//!
//! Every request gets an `x-request-id` in TypeID form, `req_<uuidv7>`. The
//! UUIDv7 suffix is time-sortable, so ids from several processes interleave
//! in arrival order in the JSON logs.
//!
//! ```rust
//! use moneta::ids::RequestId;
//!
//! let id = RequestId::new();
//! assert!(id.as_str().starts_with("req_"));
//! ```

use std::fmt;
use std::str::FromStr;

use http::{HeaderValue, Request};
use mti::prelude::*;
use tower_http::request_id::{MakeRequestId, RequestId as HeaderRequestId};

/// A `req_`-prefixed TypeID backed by a UUIDv7
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// TypeID prefix of request ids
    pub const PREFIX: &'static str = "req";

    /// A fresh, time-sortable request id
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// The id as it appears in the header
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = MagicTypeId::from_str(s).map_err(RequestIdError::Parse)?;
        if id.prefix().as_str() != Self::PREFIX {
            return Err(RequestIdError::InvalidPrefix(id.prefix().as_str().to_string()));
        }
        Ok(Self(id))
    }
}

/// A header value that is not a request id
#[derive(Debug, thiserror::Error)]
pub enum RequestIdError {
    /// Not a TypeID at all
    #[error("malformed request id: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// A TypeID of some other kind
    #[error("request id must start with 'req_', found prefix '{0}'")]
    InvalidPrefix(String),
}

/// Generates a [`RequestId`] for every request without an `x-request-id`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<HeaderRequestId> {
        let value = HeaderValue::from_str(RequestId::new().as_str()).ok()?;
        Some(HeaderRequestId::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_typeid() {
        let id = RequestId::new();
        assert!(id.as_str().starts_with("req_"));
        // prefix (3) + underscore (1) + base32 suffix (26)
        assert_eq!(id.as_str().len(), 30);
    }

    #[test]
    fn test_ids_are_distinct_and_round_trip() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert_ne!(first, second);

        let parsed: RequestId = first.to_string().parse().unwrap();
        assert_eq!(parsed, first);
    }

    #[test]
    fn test_foreign_prefix_is_rejected() {
        let other = "txn".create_type_id::<V7>().to_string();
        assert!(matches!(
            other.parse::<RequestId>(),
            Err(RequestIdError::InvalidPrefix(prefix)) if prefix == "txn"
        ));
        assert!("not an id".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_maker_sets_header_value() {
        let mut make = MakeTypedRequestId;
        let request = Request::new(());
        let first = make.make_request_id(&request).unwrap();
        let second = make.make_request_id(&request).unwrap();

        let first = first.header_value().to_str().unwrap();
        assert!(first.parse::<RequestId>().is_ok());
        assert_ne!(first, second.header_value().to_str().unwrap());
    }
}
