use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error body returned by every handler.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum ServiceError {
    /// A fee-policy configuration that cannot be honored (negative flat fee,
    /// percentage rate outside [0, 1]). Rejected at startup, never at order time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Order quantity is zero or negative.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Order quantity exceeds the listing's remaining stock.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// The listing is pending moderation or was refused.
    #[error("Listing not approved for sale: {0}")]
    ListingNotApprovedForSale(String),

    #[error("Delivery address is required")]
    MissingDeliveryAddress,

    /// Payment method credential missing or malformed (UPI id, card number, bank).
    #[error("Invalid payment credential: {0}")]
    InvalidPaymentCredential(String),

    /// A settlement produced a negative platform margin. This is a deployment
    /// misconfiguration; the ledger refuses all further orders once it occurs.
    #[error("Arithmetic invariant violation: {0}")]
    ArithmeticInvariantViolation(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidQuantity(_)
            | ServiceError::InsufficientStock(_)
            | ServiceError::MissingDeliveryAddress
            | ServiceError::InvalidPaymentCredential(_)
            | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::ListingNotApprovedForSale(_) | ServiceError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AuthError(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            // Misconfiguration: the deployment cannot settle orders consistently.
            ServiceError::InvalidConfig(_) | ServiceError::ArithmeticInvariantViolation(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to expose to API clients.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_input_errors_map_to_bad_request() {
        for err in [
            ServiceError::InvalidQuantity("0".into()),
            ServiceError::InsufficientStock("want 15, have 10".into()),
            ServiceError::MissingDeliveryAddress,
            ServiceError::InvalidPaymentCredential("UPI id".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn invariant_violation_is_not_a_client_error() {
        let err = ServiceError::ArithmeticInvariantViolation("negative margin".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ServiceError::InternalError("lock poisoned".into());
        assert_eq!(err.response_message(), "Internal server error");
    }
}
