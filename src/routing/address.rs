//! Address extraction.
//!
//! The first non-empty path segment of a request is its routing key:
//! `/chat-42/anything/else` routes to `chat-42`.

use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// The path had no non-empty segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid url, use /address")]
pub struct InvalidAddress;

/// Routing key identifying one logical client connection. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Derive the address from a request path.
    pub fn from_path(path: &str) -> Result<Self, InvalidAddress> {
        path.split('/')
            .find(|segment| !segment.is_empty())
            .map(|segment| Self(segment.to_string()))
            .ok_or(InvalidAddress)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
