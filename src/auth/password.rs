//! Credential verification against stored bcrypt hashes.

use sqlx::PgPool;
use thiserror::Error;

use crate::database::models::staff::{Staff, STATUS_ACTIVE};

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Unknown email, inactive account, and wrong password are
    /// indistinguishable to the caller.
    #[error("Invalid credentials")]
    Invalid,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Find the active staff row for `email` and verify `password` against its
/// stored hash. bcrypt's verify is a constant-time, salted comparison.
pub async fn verify_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<Staff, CredentialError> {
    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, business_id, name, email, phone, bio, position, password_hash, status, \
                created_at, updated_at \
         FROM staff WHERE lower(email) = lower($1) AND status = $2",
    )
    .bind(email)
    .bind(STATUS_ACTIVE)
    .fetch_optional(pool)
    .await?
    .ok_or(CredentialError::Invalid)?;

    if bcrypt::verify(password, &staff.password_hash)? {
        Ok(staff)
    } else {
        Err(CredentialError::Invalid)
    }
}

/// Hash a new password with the configured work factor
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, crate::config::config().auth.bcrypt_cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        // Minimum cost keeps the test fast; production cost comes from config
        let hash = bcrypt::hash("s3cret", bcrypt::DEFAULT_COST.min(4)).unwrap();
        assert!(bcrypt::verify("s3cret", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }
}
