use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::AuthSession;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub user_id: Uuid,
}

/// Handler returning the authenticated caller's identity.
pub async fn handler(AuthSession(context): AuthSession) -> Json<Response> {
    Json(Response {
        user_id: context.user_id,
    })
}
