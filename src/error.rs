use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Application-level error type
#[derive(Debug)]
pub enum AppError {
    /// Database error
    Database(sqlx::Error),
    /// Validation error
    Validation(String),
    /// Not found error
    NotFound(String),
    /// Conflict error (e.g., duplicate slug)
    Conflict(String),
    /// Authentication error
    Unauthorized(String),
    /// Forbidden error (authenticated but not an owner)
    Forbidden(String),
    /// Internal server error
    Internal(String),
}

/// Every error leaves the system as a flat `{"error": message}` body.
/// Credential and claim-token failures stay deliberately unspecific so the
/// caller cannot tell unknown from revoked, or fabricated from consumed.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(_) => write!(f, "Internal server error"),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if let Self::Database(e) = self {
            tracing::error!("Database error: {e}");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        match self {
            Self::Database(_) | Self::Internal(_) => {
                HttpResponse::InternalServerError().json(body)
            }
            Self::Validation(_) => HttpResponse::BadRequest().json(body),
            Self::NotFound(_) => HttpResponse::NotFound().json(body),
            Self::Conflict(_) => HttpResponse::Conflict().json(body),
            Self::Unauthorized(_) => HttpResponse::Unauthorized().json(body),
            Self::Forbidden(_) => HttpResponse::Forbidden().json(body),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<crate::services::AgentRegistryError> for AppError {
    fn from(err: crate::services::AgentRegistryError) -> Self {
        use crate::services::AgentRegistryError;
        match err {
            AgentRegistryError::SlugTaken(_) => Self::Conflict(err.to_string()),
            AgentRegistryError::InvalidInput(msg) => Self::Validation(msg),
            AgentRegistryError::NotFound => Self::NotFound(err.to_string()),
            AgentRegistryError::Forbidden => Self::Forbidden(err.to_string()),
            AgentRegistryError::Database(e) => Self::Database(e),
        }
    }
}

impl From<crate::services::ClaimError> for AppError {
    fn from(err: crate::services::ClaimError) -> Self {
        use crate::services::ClaimError;
        match err {
            ClaimError::InvalidOrClaimed => Self::NotFound(err.to_string()),
            ClaimError::Database(e) => Self::Database(e),
        }
    }
}

impl From<crate::services::ApiKeyError> for AppError {
    fn from(err: crate::services::ApiKeyError) -> Self {
        use crate::services::ApiKeyError;
        match err {
            ApiKeyError::CapReached | ApiKeyError::AlreadyRevoked => {
                Self::Validation(err.to_string())
            }
            ApiKeyError::NotFound => Self::NotFound(err.to_string()),
            ApiKeyError::Database(e) => Self::Database(e),
        }
    }
}

impl From<crate::services::SessionError> for AppError {
    fn from(err: crate::services::SessionError) -> Self {
        match err {
            crate::services::SessionError::Database(e) => Self::Database(e),
        }
    }
}
