//! Gatehouse is a lightweight authentication and session lifecycle API.
#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod crypto;
mod database;
pub mod error;
pub mod middleware;
mod router;
pub mod session;
pub mod token;
pub mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    bearer: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub crypto: Arc<crypto::Crypto>,
    pub users: Arc<dyn user::UserStore>,
    pub sessions: session::SessionManager,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        // Responds 408 Request Timeout on expiry.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /signup` registers and opens a session.
        .route("/signup", post(router::signup::handler))
        // `POST /signin` opens a session for an existing user.
        .route("/signin", post(router::signin::handler))
        // `POST /signin/new_token` rotates a credential pair.
        .route("/signin/new_token", post(router::refresh::handler))
        // `GET /logout` revokes the caller's session.
        .route("/logout", get(router::logout::handler))
        // `GET /info` echoes the authenticated user id.
        .route("/info", get(router::info::handler))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => {
            database::Database::new(
                &config.address,
                &config
                    .username
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .password
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .database
                    .clone()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME.into()),
                config.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let crypto = Arc::new(crypto::Crypto::new(
        config.argon2.clone(),
        config.token_hash.clone(),
    )?);

    // handle credential signing keys. distinct per kind.
    let access_secret = std::env::var("JWT_ACCESS_SECRET")
        .expect("missing `JWT_ACCESS_SECRET` environnement variable");
    let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
        .expect("missing `JWT_REFRESH_SECRET` environnement variable");

    let ttl = config.token.clone().unwrap_or(config::Token {
        access_ttl_seconds: None,
        refresh_ttl_days: None,
    });
    let tokens = Arc::new(token::TokenManager::new(
        access_secret,
        refresh_secret,
        ttl.access_ttl_seconds
            .unwrap_or(token::DEFAULT_ACCESS_TTL_SECONDS),
        ttl.refresh_ttl_days
            .unwrap_or(token::DEFAULT_REFRESH_TTL_DAYS),
    ));

    let sessions = session::SessionManager::new(
        Arc::new(session::PgSessionStore::new(db.postgres.clone())),
        tokens,
        Arc::clone(&crypto),
    );
    let users: Arc<dyn user::UserStore> =
        Arc::new(user::PgUserStore::new(db.postgres.clone()));

    Ok(AppState {
        config,
        crypto,
        users,
        sessions,
    })
}
