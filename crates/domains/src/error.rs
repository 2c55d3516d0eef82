//! # DomainError
//!
//! Centralized error handling for the complaint portal.
//! Every port and service returns this type; the HTTP layer maps each
//! variant onto a status code.

use thiserror::Error;

use crate::vocabulary::Status;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad credentials, unknown user, or an identity that already exists.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The maintenance access key did not match.
    #[error("invalid maintenance key")]
    InvalidKey,

    /// Authentication succeeded but no user record holds a role for the identity.
    #[error("no role record for user {0}")]
    NoRoleRecord(String),

    /// An attachment could not be read or decoded.
    #[error("attachment could not be encoded: {0}")]
    Encoding(String),

    /// Resource not found (entity kind, id).
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The requested status transition is not part of the lifecycle.
    #[error("cannot move complaint from {from} to {to}")]
    InvalidState { from: String, to: Status },

    /// A live subscription gave up after exhausting its retries.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// Required field missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, expired, or revoked session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure (store down, disk full, signing failure).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn complaint_not_found(id: impl ToString) -> Self {
        Self::NotFound("complaint".into(), id.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Short machine-readable name for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth_error",
            Self::InvalidKey => "invalid_key",
            Self::NoRoleRecord(_) => "no_role_record",
            Self::Encoding(_) => "encoding_error",
            Self::NotFound(..) => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::Subscription(_) => "subscription_error",
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;
