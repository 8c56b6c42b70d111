//! Billing domain errors

use thiserror::Error;
use core_kernel::{MoneyError, PortError, TemporalError};

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// A required field is missing or malformed
    #[error("Validation error on '{field}': {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// A referenced billing, payment, or case does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// A bill number collides with an existing record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation is not permitted for this billing type
    #[error("Forbidden operation: {0}")]
    ForbiddenOperation(String),

    /// Monetary arithmetic error
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Storage or collaborator failure
    #[error("Storage error: {0}")]
    Port(PortError),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BillingError::ForbiddenOperation(message.into())
    }

    /// Returns true for validation failures
    pub fn is_validation(&self) -> bool {
        matches!(self, BillingError::Validation { .. })
    }

    /// Returns true when a referenced entity was missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound { .. })
    }

    /// Returns true for bill-number collisions
    pub fn is_conflict(&self) -> bool {
        matches!(self, BillingError::Conflict(_))
    }
}

impl From<PortError> for BillingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => BillingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => BillingError::Conflict(message),
            PortError::Validation { message, field } => BillingError::Validation {
                field: field.unwrap_or_else(|| "input".to_string()),
                message,
            },
            other => BillingError::Port(other),
        }
    }
}

impl From<TemporalError> for BillingError {
    fn from(error: TemporalError) -> Self {
        BillingError::Validation {
            field: "period".to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_maps_to_domain_not_found() {
        let err: BillingError = PortError::not_found("Billing", "abc").into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_port_conflict_maps_to_conflict() {
        let err: BillingError = PortError::conflict("duplicate bill number").into();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_validation_carries_field() {
        let err = BillingError::validation("due_date", "is required");
        assert!(err.to_string().contains("due_date"));
        assert!(err.is_validation());
    }
}
