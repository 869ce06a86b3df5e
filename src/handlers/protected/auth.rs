// Session and profile management for an authenticated staff member
use axum::{response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::envelope;
use crate::auth::{password, tokens};
use crate::database::manager::DatabaseManager;
use crate::database::models::staff::Staff;
use crate::error::ApiError;
use crate::handlers::validation::{required, FieldErrors, MIN_PASSWORD_LENGTH};
use crate::middleware::AuthStaff;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// GET /auth/profile - fresh profile of the caller
pub async fn profile(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let staff = fetch_staff(&pool, &auth).await?;
    Ok(envelope::ok(staff.to_profile()))
}

/// PUT /auth/profile - partial update of the editable profile fields
pub async fn update_profile(
    Extension(auth): Extension<AuthStaff>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation_field("name", "The name field must not be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;
    let staff = sqlx::query_as::<_, Staff>(
        "UPDATE staff SET \
            name = COALESCE($1, name), \
            phone = COALESCE($2, phone), \
            bio = COALESCE($3, bio), \
            position = COALESCE($4, position), \
            updated_at = now() \
         WHERE id = $5 \
         RETURNING id, business_id, name, email, phone, bio, position, password_hash, status, \
                   created_at, updated_at",
    )
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.phone.as_deref())
    .bind(payload.bio.as_deref())
    .bind(payload.position.as_deref())
    .bind(auth.staff_id)
    .fetch_one(&pool)
    .await?;

    Ok(envelope::ok_message("Profile updated", staff.to_profile()))
}

/// POST /auth/change-password - verify the current password, store a new
/// hash, and sign out every other device
pub async fn change_password(
    Extension(auth): Extension<AuthStaff>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::new();
    if required(&payload.current_password).is_none() {
        errors.add("current_password", "The current_password field is required");
    }
    match required(&payload.new_password) {
        None => errors.add("new_password", "The new_password field is required"),
        Some(new_password) if new_password.len() < MIN_PASSWORD_LENGTH => {
            errors.add(
                "new_password",
                format!("The new password must be at least {} characters", MIN_PASSWORD_LENGTH),
            );
        }
        Some(_) => {}
    }
    errors.into_result()?;

    let current = payload.current_password.as_deref().unwrap_or_default();
    let new_password = payload.new_password.as_deref().map(str::trim).unwrap_or_default();

    let pool = DatabaseManager::pool().await?;
    let staff = fetch_staff(&pool, &auth).await?;

    // Same generic failure as login
    match bcrypt::verify(current, &staff.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::invalid_credentials()),
        Err(e) => {
            tracing::error!("Password verify error for staff {}: {}", staff.id, e);
            return Err(ApiError::server("An error occurred while processing your request"));
        }
    }

    let new_hash = password::hash_password(new_password).map_err(|e| {
        tracing::error!("Password hash error for staff {}: {}", staff.id, e);
        ApiError::server("An error occurred while processing your request")
    })?;

    sqlx::query("UPDATE staff SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&new_hash)
        .bind(staff.id)
        .execute(&pool)
        .await?;

    // Every other device must log in again; the requesting session survives
    let revoked = tokens::revoke_all(&pool, staff.id, Some(auth.session_id)).await?;
    tracing::info!("Password changed for staff {}, revoked {} token rows", staff.id, revoked);

    Ok(envelope::message("Password changed"))
}

/// POST /auth/logout - revoke the presenting session only
pub async fn logout(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    tokens::revoke_session(&pool, auth.session_id).await?;
    Ok(envelope::message("Logged out"))
}

/// POST /auth/logout-all - revoke every session of the caller
pub async fn logout_all(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let revoked = tokens::revoke_all(&pool, auth.staff_id, None).await?;
    Ok(envelope::ok_message("Logged out everywhere", json!({ "revoked_tokens": revoked })))
}

async fn fetch_staff(pool: &sqlx::PgPool, auth: &AuthStaff) -> Result<Staff, ApiError> {
    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, business_id, name, email, phone, bio, position, password_hash, status, \
                created_at, updated_at \
         FROM staff WHERE id = $1",
    )
    .bind(auth.staff_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::authentication("Account is no longer available"))?;
    Ok(staff)
}
