//! Server-side session records and their lifecycle.

mod manager;
#[cfg(test)]
pub(crate) mod memory;
mod repository;

pub use manager::*;
pub use repository::*;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::token::TokenError;

/// Session as saved on database.
///
/// Holds the digest of the single refresh credential currently valid for
/// this session; rotation replaces it atomically. Rows are never deleted,
/// revocation is terminal.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Digest of the currently valid refresh credential.
    /// Empty once the session is revoked.
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
}

/// Logical state of a [`Session`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
    /// Terminal: no transition leads back to [`SessionState::Active`].
    Revoked,
}

impl Session {
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked {
            SessionState::Revoked
        } else if self.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

/// Client details captured when a session is created.
#[derive(Clone, Debug, Default)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl SessionMetadata {
    /// Capture `User-Agent` and forwarded peer address from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };

        Self {
            user_agent: header(USER_AGENT.as_str()),
            ip: header("x-forwarded-for")
                .map(|list| list.split(',').next().unwrap_or("").trim().to_owned())
                .filter(|ip| !ip.is_empty()),
        }
    }
}

/// Why a lifecycle operation failed.
///
/// Only [`SessionError::Store`], [`SessionError::Crypto`] and
/// [`SessionError::Sign`] reach clients as something other than an opaque
/// 401; the rest collapse in `error.rs`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("credential is malformed")]
    Malformed,
    #[error("credential signature is invalid")]
    InvalidSignature,
    #[error("credential or session is expired")]
    Expired,
    #[error("session not found")]
    NotFound,
    #[error("session is revoked")]
    Revoked,
    #[error("refresh credential does not match stored digest")]
    HashMismatch,

    #[error("credential could not be signed")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => SessionError::Malformed,
            TokenError::InvalidSignature => SessionError::InvalidSignature,
            TokenError::Expired => SessionError::Expired,
            TokenError::Sign(err) => SessionError::Sign(err),
        }
    }
}

/// Persistence port for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a freshly created session.
    async fn insert(&self, session: &Session) -> Result<(), SessionError>;

    /// Find a session by its identity.
    async fn find(&self, id: Uuid) -> Result<Option<Session>, SessionError>;

    /// Atomically replace the stored refresh digest and extend expiry,
    /// conditioned on the digest still being `previous_hash` and the session
    /// not being revoked. Returns `false` when the condition no longer
    /// holds, so two concurrent rotations can never both succeed.
    async fn rotate(
        &self,
        id: Uuid,
        previous_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionError>;

    /// Mark a session revoked and clear its digest. Safe to repeat on an
    /// already revoked session; returns `false` if the id does not exist.
    async fn revoke(&self, id: Uuid) -> Result<bool, SessionError>;
}
