//! Opaque bearer token lifecycle: issue, refresh (with rotation), revoke.
//!
//! A login mints one access and one refresh value under a shared session id
//! and device label. Values are 32 random bytes, base64url-encoded; only
//! their SHA-256 digests are stored. Refresh consumes the presented session
//! atomically and mints a replacement pair.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::staff::Staff;
use crate::database::models::token::TokenKind;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Token not found, revoked, or expired. Maps to 401 at the boundary.
    #[error("Invalid token")]
    InvalidToken,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Plaintext pair handed to the client exactly once
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Authenticated identity resolved from a live access token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub staff: Staff,
    pub session_id: Uuid,
}

/// 32 random bytes, base64url without padding (43 chars)
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 digest, the only form that touches the database
pub fn hash_token(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Mint a new session for `staff_id` labeled with `device_name`
pub async fn issue(
    pool: &PgPool,
    staff_id: Uuid,
    device_name: &str,
) -> Result<IssuedTokens, TokenError> {
    let mut tx = pool.begin().await?;
    let issued = insert_pair(&mut tx, staff_id, device_name).await?;
    tx.commit().await?;
    Ok(issued)
}

/// Exchange a refresh token for a fresh pair, rotating the old session.
///
/// The presented refresh row is claimed with a conditional UPDATE, so a
/// second concurrent exchange of the same value loses the race and gets
/// `InvalidToken` rather than a second pair.
pub async fn refresh(pool: &PgPool, refresh_value: &str) -> Result<IssuedTokens, TokenError> {
    let token_hash = hash_token(refresh_value);
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query_as::<_, (Uuid, Uuid, String)>(
        "UPDATE api_tokens SET revoked_at = now() \
         WHERE token_hash = $1 AND kind = $2 AND revoked_at IS NULL AND expires_at > now() \
         RETURNING staff_id, session_id, device_name",
    )
    .bind(&token_hash)
    .bind(TokenKind::Refresh.as_str())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TokenError::InvalidToken)?;

    let (staff_id, session_id, device_name) = claimed;

    // Retire the paired access token as well
    sqlx::query("UPDATE api_tokens SET revoked_at = now() WHERE session_id = $1 AND revoked_at IS NULL")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    let issued = insert_pair(&mut tx, staff_id, &device_name).await?;
    tx.commit().await?;
    Ok(issued)
}

/// Revoke both rows of one session (logout of the presenting device)
pub async fn revoke_session(pool: &PgPool, session_id: Uuid) -> Result<(), TokenError> {
    sqlx::query("UPDATE api_tokens SET revoked_at = now() WHERE session_id = $1 AND revoked_at IS NULL")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke every live token of a staff member. `except_session` spares one
/// session: password change keeps the caller logged in on the device that
/// made the request.
pub async fn revoke_all(
    pool: &PgPool,
    staff_id: Uuid,
    except_session: Option<Uuid>,
) -> Result<u64, TokenError> {
    let result = match except_session {
        Some(session_id) => {
            sqlx::query(
                "UPDATE api_tokens SET revoked_at = now() \
                 WHERE staff_id = $1 AND revoked_at IS NULL AND session_id <> $2",
            )
            .bind(staff_id)
            .bind(session_id)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query("UPDATE api_tokens SET revoked_at = now() WHERE staff_id = $1 AND revoked_at IS NULL")
                .bind(staff_id)
                .execute(pool)
                .await?
        }
    };
    Ok(result.rows_affected())
}

/// Resolve an access token value to its active staff row and session
pub async fn authenticate(pool: &PgPool, access_value: &str) -> Result<AuthSession, TokenError> {
    use crate::database::models::staff::STATUS_ACTIVE;

    let token_hash = hash_token(access_value);

    #[derive(sqlx::FromRow)]
    struct AuthRow {
        #[sqlx(flatten)]
        staff: Staff,
        session_id: Uuid,
    }

    let row = sqlx::query_as::<_, AuthRow>(
        "SELECT s.id, s.business_id, s.name, s.email, s.phone, s.bio, s.position, \
                s.password_hash, s.status, s.created_at, s.updated_at, t.session_id \
         FROM api_tokens t \
         JOIN staff s ON s.id = t.staff_id \
         WHERE t.token_hash = $1 AND t.kind = $2 AND t.revoked_at IS NULL \
           AND t.expires_at > now() AND s.status = $3",
    )
    .bind(&token_hash)
    .bind(TokenKind::Access.as_str())
    .bind(STATUS_ACTIVE)
    .fetch_optional(pool)
    .await?
    .ok_or(TokenError::InvalidToken)?;

    Ok(AuthSession { staff: row.staff, session_id: row.session_id })
}

/// Insert one access/refresh pair under a fresh session id
async fn insert_pair(
    tx: &mut Transaction<'_, Postgres>,
    staff_id: Uuid,
    device_name: &str,
) -> Result<IssuedTokens, TokenError> {
    let auth_config = &crate::config::config().auth;
    let session_id = Uuid::new_v4();
    let now = Utc::now();

    let access_value = generate_token_value();
    let refresh_value = generate_token_value();
    let access_expires = now + Duration::seconds(auth_config.access_token_ttl_secs);
    let refresh_expires = now + Duration::days(auth_config.refresh_token_ttl_days);

    sqlx::query(
        "INSERT INTO api_tokens (id, staff_id, session_id, device_name, kind, token_hash, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(staff_id)
    .bind(session_id)
    .bind(device_name)
    .bind(TokenKind::Access.as_str())
    .bind(hash_token(&access_value))
    .bind(now)
    .bind(access_expires)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO api_tokens (id, staff_id, session_id, device_name, kind, token_hash, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(staff_id)
    .bind(session_id)
    .bind(device_name)
    .bind(TokenKind::Refresh.as_str())
    .bind(hash_token(&refresh_value))
    .bind(now)
    .bind(refresh_expires)
    .execute(&mut **tx)
    .await?;

    Ok(IssuedTokens {
        access_token: access_value,
        refresh_token: refresh_value,
        expires_in: auth_config.access_token_ttl_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_values_are_43_chars_of_base64url() {
        let value = generate_token_value();
        assert_eq!(value.len(), 43);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn token_values_do_not_repeat() {
        let values: HashSet<String> = (0..256).map(|_| generate_token_value()).collect();
        assert_eq!(values.len(), 256);
    }

    #[test]
    fn digests_are_stable_hex() {
        let a = hash_token("some-token-value");
        let b = hash_token("some-token-value");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, hash_token("other-token-value"));
    }
}
