use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;
use crate::router::signup::{Body, Response};
use crate::session::SessionMetadata;

/// Handler to open a new session for an existing user.
///
/// An unknown identifier and a wrong password are indistinguishable to the
/// caller.
pub async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = state
        .users
        .find_by_identifier(&body.identifier)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if !state
        .crypto
        .pwd
        .verify_password(&body.password, &user.password_hash)
    {
        return Err(ServerError::Unauthorized);
    }

    let (_, pair) = state
        .sessions
        .create(user.id, SessionMetadata::from_headers(&headers))
        .await?;

    Ok(Json(Response {
        user_id: user.id,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        access_expires_in: pair.expires_in,
    }))
}

#[cfg(test)]
mod tests {
    use crate::{app, make_request, router};
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_signin() {
        let app = app(router::state());

        let response = make_request(
            app.clone(),
            Method::POST,
            "/signup",
            None,
            json!({"identifier": "a@x.com", "password": "secret1"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app,
            Method::POST,
            "/signin",
            None,
            json!({"identifier": "a@x.com", "password": "secret1"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: super::Response = serde_json::from_slice(&body).unwrap();
        assert!(!body.access_token.is_empty());
        assert!(!body.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_signin_wrong_password() {
        let state = router::state();
        let app = app(state.clone());

        let response = make_request(
            app.clone(),
            Method::POST,
            "/signup",
            None,
            json!({"identifier": "a@x.com", "password": "secret1"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        // Wrong password and unknown identifier return the same outcome,
        // and neither creates a session.
        for body in [
            json!({"identifier": "a@x.com", "password": "wrong1"}),
            json!({"identifier": "b@x.com", "password": "secret1"}),
        ] {
            let response = make_request(
                app.clone(),
                Method::POST,
                "/signin",
                None,
                body.to_string(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
