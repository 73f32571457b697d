//! Per-request access guard.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::AppState;
use crate::error::ServerError;
use crate::session::AuthContext;

/// Authenticated caller, extracted from an `Authorization: Bearer <token>`
/// header.
///
/// Beyond signature and expiry, the referenced session must still be live:
/// a revoked session rejects access tokens that have not expired yet.
pub struct AuthSession(pub AuthContext);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ServerError::Unauthorized)?;

        let context = state.sessions.authorize(token).await?;
        Ok(AuthSession(context))
    }
}
