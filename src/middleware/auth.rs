use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::tokens::{self, AuthSession};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// Authenticated identity resolved from the presented access token.
///
/// Handlers take this via `Extension<AuthStaff>`; the business id on it is
/// the only tenant id any query may use.
#[derive(Clone, Debug)]
pub struct AuthStaff {
    pub staff_id: Uuid,
    pub business_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<AuthSession> for AuthStaff {
    fn from(session: AuthSession) -> Self {
        Self {
            staff_id: session.staff.id,
            business_id: session.staff.business_id,
            session_id: session.session_id,
            name: session.staff.name,
            email: session.staff.email,
        }
    }
}

/// Middleware that resolves `Authorization: Bearer <token>` to an active
/// staff session and injects the identity into request extensions
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::authentication)?;

    let pool = DatabaseManager::pool().await?;
    let session = tokens::authenticate(&pool, &token).await?;

    let auth_staff = AuthStaff::from(session);
    tracing::debug!("Authenticated {} (session {})", auth_staff.email, auth_staff.session_id);

    request.extensions_mut().insert(auth_staff);
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_rejected() {
        let headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc123");
    }
}
