//! Escrow Error Types
//!
//! Error codes are stable strings used in API responses and logs.

use thiserror::Error;

use crate::status::PaymentStatus;

/// Escrow engine error taxonomy
#[derive(Error, Debug, Clone)]
pub enum EscrowError {
    // === Lookup Errors ===
    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error("Dispute not found: {0}")]
    DisputeNotFound(String),

    // === State Machine Errors ===
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Concurrent write detected for payment {0}")]
    PersistenceConflict(String),

    // === Validation Errors ===
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Amount must be a positive decimal")]
    InvalidAmount,

    #[error("Dispute already resolved: {0}")]
    DisputeAlreadyResolved(String),

    // === External Collaborator Errors ===
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Webhook signature invalid")]
    SignatureInvalid,

    // === System Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal system error: {0}")]
    System(String),
}

impl EscrowError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EscrowError::NotFound(_) => "PAYMENT_NOT_FOUND",
            EscrowError::DisputeNotFound(_) => "DISPUTE_NOT_FOUND",
            EscrowError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EscrowError::PersistenceConflict(_) => "PERSISTENCE_CONFLICT",
            EscrowError::Forbidden(_) => "FORBIDDEN",
            EscrowError::InvalidAmount => "INVALID_AMOUNT",
            EscrowError::DisputeAlreadyResolved(_) => "DISPUTE_ALREADY_RESOLVED",
            EscrowError::ProviderError(_) => "PROVIDER_ERROR",
            EscrowError::SignatureInvalid => "SIGNATURE_INVALID",
            EscrowError::Database(_) => "DATABASE_ERROR",
            EscrowError::System(_) => "SYSTEM_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            EscrowError::NotFound(_) | EscrowError::DisputeNotFound(_) => 404,
            EscrowError::InvalidTransition { .. }
            | EscrowError::InvalidAmount
            | EscrowError::DisputeAlreadyResolved(_) => 422,
            EscrowError::PersistenceConflict(_) => 409,
            EscrowError::Forbidden(_) => 403,
            EscrowError::SignatureInvalid => 401,
            EscrowError::ProviderError(_) => 502,
            EscrowError::Database(_) | EscrowError::System(_) => 500,
        }
    }
}

impl From<sqlx::Error> for EscrowError {
    fn from(e: sqlx::Error) -> Self {
        EscrowError::Database(e.to_string())
    }
}

impl From<anyhow::Error> for EscrowError {
    fn from(e: anyhow::Error) -> Self {
        EscrowError::System(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EscrowError::NotFound("p1".into()).code(),
            "PAYMENT_NOT_FOUND"
        );
        assert_eq!(EscrowError::SignatureInvalid.code(), "SIGNATURE_INVALID");
        assert_eq!(
            EscrowError::InvalidTransition {
                from: PaymentStatus::Released,
                to: PaymentStatus::Paid,
            }
            .code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(EscrowError::SignatureInvalid.http_status(), 401);
        assert_eq!(EscrowError::Forbidden("owner".into()).http_status(), 403);
        assert_eq!(EscrowError::NotFound("p1".into()).http_status(), 404);
        assert_eq!(
            EscrowError::PersistenceConflict("p1".into()).http_status(),
            409
        );
        assert_eq!(EscrowError::Database("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_display() {
        let err = EscrowError::InvalidTransition {
            from: PaymentStatus::Released,
            to: PaymentStatus::Paid,
        };
        assert_eq!(err.to_string(), "Invalid status transition: released -> paid");
    }
}
