use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::session::SessionMetadata;
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Identifier must contain at least 3 characters."
    ))]
    pub identifier: String,
    #[validate(length(
        min = 6,
        max = 255,
        message = "Password must contain at least 6 characters."
    ))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_in: u64,
}

/// Handler to register a user and open their first session.
pub async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let password_hash = state.crypto.pwd.hash_password(&body.password)?;
    let user = User::new(body.identifier, password_hash);
    state.users.insert(&user).await?;

    let (_, pair) = state
        .sessions
        .create(user.id, SessionMetadata::from_headers(&headers))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            user_id: user.id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_expires_in: pair.expires_in,
        }),
    ))
}
