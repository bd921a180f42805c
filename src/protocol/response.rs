//! Response definitions
//!
//! Renders engine outcomes as protocol response text.

use std::fmt;

/// A response to send to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Mutation acknowledged
    Ok,

    /// The stored value for a GET
    Value(String),

    /// GET on an absent or deleted key
    NotFound,

    /// Unknown verb, wrong arity, or empty input
    Invalid,

    /// Engine error, reported verbatim
    Error(String),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Value(v) => write!(f, "{v}"),
            Response::NotFound => write!(f, "Data not found"),
            Response::Invalid => write!(f, "Invalid command"),
            Response::Error(msg) => write!(f, "{msg}"),
        }
    }
}
