//! Exchange a refresh credential for a rotated pair.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "refreshToken is required."))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_in: u64,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let pair = state.sessions.refresh(&body.refresh_token).await?;

    Ok(Json(Response {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        access_expires_in: pair.expires_in,
    }))
}
