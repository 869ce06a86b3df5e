// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Domain errors are raised intentionally by handlers; everything else is
/// converted to `Server` at the boundary with a generic message while the
/// real cause is logged.
#[derive(Debug)]
pub enum ApiError {
    // 422 Unprocessable Entity
    Validation {
        message: String,
        errors: HashMap<String, Vec<String>>,
    },

    // 401 Unauthorized
    Authentication(String),

    // 404 Not Found (also: resource outside the caller's tenant/participant scope)
    NotFound(String),

    // 500 Internal Server Error
    Server(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 422,
            ApiError::Authentication(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Server(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::Authentication(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Server(msg) => msg,
        }
    }

    /// Convert to the response envelope body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Validation { message, errors } => json!({
                "success": false,
                "message": message,
                "errors": errors,
            }),
            _ => json!({
                "success": false,
                "message": self.message(),
            }),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation(message: impl Into<String>, errors: HashMap<String, Vec<String>>) -> Self {
        ApiError::Validation { message: message.into(), errors }
    }

    /// Validation error for a single offending field
    pub fn validation_field(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.into(), vec![problem.into()]);
        ApiError::Validation {
            message: "The given data was invalid".to_string(),
            errors,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        ApiError::Authentication(message.into())
    }

    /// The uniform credential failure. Never varies by which field was wrong.
    pub fn invalid_credentials() -> Self {
        ApiError::Authentication("Invalid credentials".to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn server(message: impl Into<String>) -> Self {
        ApiError::Server(message.into())
    }
}

// Convert other error types to ApiError at the HTTP boundary
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            other => {
                tracing::error!("SQLx error: {}", other);
                ApiError::server("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::server("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::auth::password::CredentialError> for ApiError {
    fn from(err: crate::auth::password::CredentialError) -> Self {
        match err {
            crate::auth::password::CredentialError::Invalid => ApiError::invalid_credentials(),
            crate::auth::password::CredentialError::Database(e) => {
                tracing::error!("Credential lookup database error: {}", e);
                ApiError::server("An error occurred while processing your request")
            }
            crate::auth::password::CredentialError::Hash(e) => {
                tracing::error!("Password hash error: {}", e);
                ApiError::server("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::auth::tokens::TokenError> for ApiError {
    fn from(err: crate::auth::tokens::TokenError) -> Self {
        match err {
            crate::auth::tokens::TokenError::InvalidToken => {
                ApiError::authentication("Invalid or expired token")
            }
            crate::auth::tokens::TokenError::Database(e) => {
                tracing::error!("Token store database error: {}", e);
                ApiError::server("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::query::QueryError> for ApiError {
    fn from(err: crate::query::QueryError) -> Self {
        ApiError::validation_field(err.field(), err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(ApiError::validation_field("email", "required").status_code(), 422);
        assert_eq!(ApiError::invalid_credentials().status_code(), 401);
        assert_eq!(ApiError::not_found("Client not found").status_code(), 404);
        assert_eq!(ApiError::server("boom").status_code(), 500);
    }

    #[test]
    fn validation_envelope_carries_field_errors() {
        let err = ApiError::validation_field("email", "The email field is required");
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["email"][0], "The email field is required");
    }

    #[test]
    fn non_validation_envelope_has_no_errors_key() {
        let body = ApiError::invalid_credentials().to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid credentials");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
