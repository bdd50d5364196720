//! The reply shape returned by every dispatched command.
//!
//! Deliberately protocol-agnostic: `ember-engine` never encodes RESP
//! wire bytes (that belongs to an out-of-scope network front end), but
//! the variants mirror RESP2's so a future encoder is a direct mapping.

use bytes::Bytes;
use ember_core::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(&'static str),
    Bulk(Bytes),
    Nil,
    Integer(i64),
    Double(f64),
    Array(Vec<Reply>),
    Error(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Simple("OK")
    }

    pub fn bulk(bytes: impl Into<Bytes>) -> Self {
        Reply::Bulk(bytes.into())
    }

    pub fn from_optional(bytes: Option<Bytes>) -> Self {
        match bytes {
            Some(b) => Reply::Bulk(b),
            None => Reply::Nil,
        }
    }
}

impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        Reply::Error(err.to_string())
    }
}

pub type DispatchResult = Result<Reply, Error>;
