//! Connection authorization.
//!
//! The backend decides by body text alone: exactly `ok` allows the
//! connection, anything else denies it with the body as the reason. The
//! status code is logged and otherwise ignored.

use crate::backend::{BackendChannel, BackendError};
use crate::observability::metrics;

/// Body text that authorizes a connection.
pub const ALLOW_BODY: &[u8] = b"ok";

/// Outcome of a completed authorization call.
#[derive(Debug)]
pub enum Authorization {
    /// Carries the channel used for the call; it becomes the connection's
    /// backend channel.
    Allowed(BackendChannel),
    /// Backend-supplied reason, verbatim.
    Denied(String),
}

pub fn is_allowed(body: &[u8]) -> bool {
    body == ALLOW_BODY
}

/// Ask the backend whether a connection for the channel's address may proceed.
pub async fn authorize(channel: BackendChannel) -> Result<Authorization, BackendError> {
    let reply = match channel.get().await {
        Ok(reply) => reply,
        // a body past the limit cannot be "ok"
        Err(BackendError::TooLarge { limit, prefix }) => {
            tracing::debug!(uri = %channel.uri(), limit, "Authorization reply over size limit");
            metrics::record_authorization("denied");
            return Ok(Authorization::Denied(String::from_utf8_lossy(&prefix).into_owned()));
        }
        Err(e) => {
            metrics::record_authorization("error");
            return Err(e);
        }
    };

    tracing::debug!(
        uri = %channel.uri(),
        status = %reply.status,
        "Authorization reply received"
    );

    if is_allowed(&reply.body) {
        metrics::record_authorization("allowed");
        Ok(Authorization::Allowed(channel))
    } else {
        metrics::record_authorization("denied");
        Ok(Authorization::Denied(String::from_utf8_lossy(&reply.body).into_owned()))
    }
}
