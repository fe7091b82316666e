use sea_orm::error::DbErr;

/// Domain error taxonomy for the fulfillment core.
///
/// Every service operation returns a typed `ServiceError`; the HTTP layer
/// (out of scope for this crate) translates variants into user-facing
/// messages and status codes. Failures that affect money or stock are never
/// swallowed here; the only tolerated partial failure is a per-item
/// inventory restoration against a machine or slot that no longer exists,
/// which callers log and skip.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Aggregated cart/order line validation failures. Each entry names one
    /// offending line; the whole operation fails as a unit.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Amount mismatch: {0}")]
    AmountMismatch(String),

    #[error("Already paid: {0}")]
    AlreadyPaid(String),

    #[error("Not refundable: {0}")]
    NotRefundable(String),

    #[error("Exceeds refundable amount: {0}")]
    ExceedsRefundable(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Machine-readable error code for logging and controller mapping.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::DatabaseError(_) => "database_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::InvalidOperation(_) => "invalid_operation",
            ServiceError::InsufficientStock(_) => "insufficient_stock",
            ServiceError::ValidationFailed(_) => "validation_failed",
            ServiceError::AmountMismatch(_) => "amount_mismatch",
            ServiceError::AlreadyPaid(_) => "already_paid",
            ServiceError::NotRefundable(_) => "not_refundable",
            ServiceError::ExceedsRefundable(_) => "exceeds_refundable",
            ServiceError::GatewayError(_) => "gateway_error",
            ServiceError::ValidationError(_) => "validation_error",
            ServiceError::EventError(_) => "event_error",
            ServiceError::InternalError(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failed_joins_line_reasons() {
        let err = ServiceError::ValidationFailed(vec![
            "slot 3: insufficient stock (available 1)".to_string(),
            "slot 7: price changed from 20.00 to 25.00".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("slot 3"));
        assert!(msg.contains("; "));
        assert!(msg.contains("slot 7"));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).code(),
            "insufficient_stock"
        );
        assert_eq!(
            ServiceError::ExceedsRefundable("x".into()).code(),
            "exceeds_refundable"
        );
    }
}
