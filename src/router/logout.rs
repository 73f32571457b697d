use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::middleware::AuthSession;
use crate::session::SessionError;

#[derive(Debug, Serialize)]
pub struct Response {
    message: String,
}

/// Handler to revoke the caller's session.
pub async fn handler(
    State(state): State<AppState>,
    AuthSession(context): AuthSession,
) -> Result<Json<Response>> {
    state
        .sessions
        .revoke(context.session_id)
        .await
        .map_err(|err| match err {
            SessionError::NotFound => ServerError::SessionNotFound,
            err => err.into(),
        })?;

    Ok(Json(Response {
        message: "Logged out".to_owned(),
    }))
}
