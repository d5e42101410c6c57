//! Error responses.
//!
//! Maps each [`GatewayError`] to the status the client sees. Bodies are
//! plain text; a denial's body is exactly the backend's reason.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidAddress => StatusCode::BAD_REQUEST,
            GatewayError::NoUpgradeRequested => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UnknownAddress(_) => StatusCode::NOT_FOUND,
            GatewayError::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Denied(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::relay::RelayError;
    use crate::routing::Address;
    use std::time::Duration;

    #[test]
    fn statuses_follow_error_taxonomy() {
        let cases = [
            (GatewayError::InvalidAddress, 400),
            (GatewayError::NoUpgradeRequested, 500),
            (GatewayError::UnknownAddress(Address::from_path("/a").unwrap()), 404),
            (GatewayError::BodyRead("eof".into()), 500),
            (GatewayError::Delivery(RelayError::ConnectionClosed), 500),
            (GatewayError::Backend(BackendError::Timeout(Duration::from_secs(1))), 502),
            (GatewayError::Denied("nope".into()), 403),
        ];
        for (error, status) in cases {
            assert_eq!(error.status().as_u16(), status, "{error}");
        }
    }

    #[test]
    fn bodies_are_descriptive() {
        assert_eq!(GatewayError::InvalidAddress.to_string(), "invalid url, use /address");
        assert_eq!(GatewayError::NoUpgradeRequested.to_string(), "no upgrade requested");
        assert_eq!(GatewayError::Denied("deny-x".into()).to_string(), "deny-x");
    }
}
