// Token acquisition: login and refresh, the only endpoints that accept a
// request without a bearer token
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::envelope;
use crate::auth::{password, tokens};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::validation::{is_valid_email, required, FieldErrors};

const DEFAULT_DEVICE_NAME: &str = "mobile";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /auth/login - exchange credentials for a token pair plus profile
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::new();
    match required(&payload.email) {
        Some(email) if !is_valid_email(email) => {
            errors.add("email", "The email must be a valid email address");
        }
        Some(_) => {}
        None => errors.add("email", "The email field is required"),
    }
    if required(&payload.password).is_none() {
        errors.add("password", "The password field is required");
    }
    errors.into_result()?;

    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    let password_value = payload.password.as_deref().unwrap_or_default();

    let pool = DatabaseManager::pool().await?;
    let staff = password::verify_credentials(&pool, email, password_value).await?;

    let device_name = required(&payload.device_name).unwrap_or(DEFAULT_DEVICE_NAME);
    let issued = tokens::issue(&pool, staff.id, device_name).await?;

    tracing::info!("Login for staff {} ({})", staff.id, device_name);

    Ok(envelope::ok(json!({
        "access_token": issued.access_token,
        "refresh_token": issued.refresh_token,
        "token_type": "Bearer",
        "expires_in": issued.expires_in,
        "staff": staff.to_profile(),
    })))
}

/// POST /auth/refresh - rotate a refresh token into a new pair
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> Result<Json<Value>, ApiError> {
    let refresh_token = required(&payload.refresh_token)
        .ok_or_else(|| ApiError::validation_field("refresh_token", "The refresh_token field is required"))?;

    let pool = DatabaseManager::pool().await?;
    let issued = tokens::refresh(&pool, refresh_token).await?;

    Ok(envelope::ok(json!({
        "access_token": issued.access_token,
        "refresh_token": issued.refresh_token,
        "token_type": "Bearer",
        "expires_in": issued.expires_in,
    })))
}
