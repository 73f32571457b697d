//! Signed, time-bounded access and refresh credentials.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL_SECONDS: u64 = 600;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;

/// Which half of a credential pair a token belongs to.
///
/// Each kind is signed with its own key, so an access token can never be
/// presented where a refresh token is expected, nor the other way around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Pieces of information asserted on a token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: Uuid,
    /// Session ID the credential is bound to.
    pub sid: Uuid,
    /// Unique per-issuance nonce, distinguishes every minted token.
    pub jti: Uuid,
    /// Identifies the time at which the token was issued.
    pub iat: i64,
    /// Identifies the expiration time on or after which the token must not
    /// be accepted for processing.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("token could not be signed")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Mint and check the two credential kinds.
pub struct TokenManager {
    algorithm: Algorithm,
    access: KeyPair,
    refresh: KeyPair,
    access_ttl_seconds: u64,
    refresh_ttl_days: i64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] with distinct secrets per kind.
    pub fn new(
        access_secret: impl AsRef<[u8]>,
        refresh_secret: impl AsRef<[u8]>,
        access_ttl_seconds: u64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            access: KeyPair::from_secret(access_secret.as_ref()),
            refresh: KeyPair::from_secret(refresh_secret.as_ref()),
            access_ttl_seconds,
            refresh_ttl_days,
        }
    }

    /// Access token lifetime, as reported to clients in `accessExpiresIn`.
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl_seconds
    }

    /// Refresh token lifetime, also the session record expiry window.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_ttl_days)
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds as i64,
            TokenKind::Refresh => self.refresh_ttl_days * 24 * 3600,
        }
    }

    /// Mint a new signed token binding `user_id` to `session_id`.
    pub fn issue(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        self.issue_at(kind, user_id, session_id, now, now + self.ttl_seconds(kind))
    }

    fn issue_at(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        session_id: Uuid,
        iat: i64,
        exp: i64,
    ) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            jti: Uuid::new_v4(),
            iat,
            exp,
        };

        encode(&header, &claims, &self.keys(kind).encoding).map_err(TokenError::Sign)
    }

    /// Mint a token with an arbitrary expiry instant.
    #[cfg(test)]
    pub fn issue_with_exp(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        session_id: Uuid,
        exp: i64,
    ) -> Result<String, TokenError> {
        self.issue_at(kind, user_id, session_id, chrono::Utc::now().timestamp(), exp)
    }

    /// Decode and check a token of the given kind.
    ///
    /// Expiry is checked with zero leeway: a token presented exactly at its
    /// expiry instant is already expired.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
