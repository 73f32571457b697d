use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Status {
    name: String,
    version: String,
    url: String,
}

/// Liveness document.
pub async fn status(State(state): State<AppState>) -> Json<Status> {
    Json(Status {
        name: state.config.name.clone(),
        version: state.config.version.clone(),
        url: state.config.url.clone(),
    })
}
