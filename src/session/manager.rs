//! Session lifecycle orchestration: creation, rotation, revocation.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::crypto::Crypto;
use crate::session::{
    Session, SessionError, SessionMetadata, SessionState, SessionStore,
};
use crate::token::{TokenKind, TokenManager};

/// A freshly minted credential pair handed back to the client.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Identity attached to an authorized request.
#[derive(Clone, Copy, Debug)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Orchestrates the session state machine over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    tokens: Arc<TokenManager>,
    crypto: Arc<Crypto>,
}

impl SessionManager {
    /// Create a new [`SessionManager`].
    pub fn new(
        store: Arc<dyn SessionStore>,
        tokens: Arc<TokenManager>,
        crypto: Arc<Crypto>,
    ) -> Self {
        Self {
            store,
            tokens,
            crypto,
        }
    }

    fn mint_pair(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<TokenPair, SessionError> {
        let access_token =
            self.tokens.issue(TokenKind::Access, user_id, session_id)?;
        let refresh_token =
            self.tokens.issue(TokenKind::Refresh, user_id, session_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl_seconds(),
        })
    }

    /// Open a new session for `user_id` and mint its first credential pair.
    pub async fn create(
        &self,
        user_id: Uuid,
        metadata: SessionMetadata,
    ) -> Result<(Uuid, TokenPair), SessionError> {
        let session_id = Uuid::new_v4();
        let pair = self.mint_pair(user_id, session_id)?;

        let session = Session {
            id: session_id,
            user_id,
            refresh_token_hash: self.crypto.tokens.hash(&pair.refresh_token)?,
            user_agent: metadata.user_agent,
            ip: metadata.ip,
            revoked: false,
            expires_at: Utc::now() + self.tokens.refresh_ttl(),
        };
        self.store.insert(&session).await?;

        tracing::info!(session_id = %session_id, user_id = %user_id, "session created");
        Ok((session_id, pair))
    }

    /// Exchange a refresh credential for a rotated pair.
    ///
    /// The presented token must match the single digest stored for its
    /// session. A mismatching but well-signed token means the current
    /// credential was rotated out already, which is treated as theft: the
    /// whole session is revoked rather than only failing the request.
    pub async fn refresh(
        &self,
        presented: &str,
    ) -> Result<TokenPair, SessionError> {
        let claims = self.tokens.verify(TokenKind::Refresh, presented)?;

        let session = self
            .store
            .find(claims.sid)
            .await?
            .ok_or(SessionError::NotFound)?;
        if session.revoked {
            return Err(SessionError::Revoked);
        }

        let now = Utc::now();
        if session.expires_at <= now {
            // Logically EXPIRED, left untouched.
            return Err(SessionError::Expired);
        }

        if !self
            .crypto
            .tokens
            .verify(presented, &session.refresh_token_hash)
        {
            self.store.revoke(session.id).await?;
            tracing::warn!(
                session_id = %session.id,
                user_id = %session.user_id,
                "refresh credential reuse detected, session revoked"
            );
            return Err(SessionError::HashMismatch);
        }

        let pair = self.mint_pair(session.user_id, session.id)?;
        let digest = self.crypto.tokens.hash(&pair.refresh_token)?;

        let rotated = self
            .store
            .rotate(
                session.id,
                &session.refresh_token_hash,
                &digest,
                now + self.tokens.refresh_ttl(),
            )
            .await?;
        if !rotated {
            // A concurrent rotation won with the same credential; the minted
            // pair is discarded and the session closed.
            self.store.revoke(session.id).await?;
            tracing::warn!(
                session_id = %session.id,
                "concurrent refresh conflict, session revoked"
            );
            return Err(SessionError::HashMismatch);
        }

        tracing::debug!(session_id = %session.id, "refresh credential rotated");
        Ok(pair)
    }

    /// Revoke a session (logout). Terminal and idempotent on an existing
    /// session; fails with [`SessionError::NotFound`] otherwise.
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), SessionError> {
        if !self.store.revoke(session_id).await? {
            return Err(SessionError::NotFound);
        }

        tracing::info!(session_id = %session_id, "session revoked");
        Ok(())
    }

    /// Verify an access credential and cross-check its session's live state,
    /// so revocation takes effect before the token's own expiry.
    pub async fn authorize(
        &self,
        access_token: &str,
    ) -> Result<AuthContext, SessionError> {
        let claims = self.tokens.verify(TokenKind::Access, access_token)?;

        let session = self
            .store
            .find(claims.sid)
            .await?
            .ok_or(SessionError::NotFound)?;

        match session.state(Utc::now()) {
            SessionState::Active => Ok(AuthContext {
                user_id: claims.sub,
                session_id: claims.sid,
            }),
            SessionState::Expired => Err(SessionError::Expired),
            SessionState::Revoked => Err(SessionError::Revoked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2 as ArgonConfig;
    use crate::session::memory::MemorySessionStore;

    fn light() -> Option<ArgonConfig> {
        Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        })
    }

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(MemorySessionStore::default()),
            Arc::new(TokenManager::new("access-secret", "refresh-secret", 600, 30)),
            Arc::new(Crypto::new(light(), light()).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_create_then_refresh_once() {
        let manager = manager();
        let user = Uuid::new_v4();

        let (session_id, pair) = manager
            .create(user, SessionMetadata::default())
            .await
            .unwrap();
        assert_eq!(pair.expires_in, 600);

        let rotated = manager.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // Replaying the already rotated-out credential revokes the session.
        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(SessionError::HashMismatch)
        ));
        assert!(matches!(
            manager.refresh(&rotated.refresh_token).await,
            Err(SessionError::Revoked)
        ));
        assert!(matches!(
            manager.authorize(&rotated.access_token).await,
            Err(SessionError::Revoked)
        ));
        let _ = session_id;
    }

    #[tokio::test]
    async fn test_revocation_is_terminal() {
        let manager = manager();
        let (session_id, pair) = manager
            .create(Uuid::new_v4(), SessionMetadata::default())
            .await
            .unwrap();

        manager.revoke(session_id).await.unwrap();
        // Idempotent on an existing session.
        manager.revoke(session_id).await.unwrap();
        assert!(matches!(
            manager.revoke(Uuid::new_v4()).await,
            Err(SessionError::NotFound)
        ));

        // Credentials are still well-signed and unexpired, yet every
        // operation referencing the session fails.
        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(SessionError::Revoked)
        ));
        assert!(matches!(
            manager.authorize(&pair.access_token).await,
            Err(SessionError::Revoked)
        ));
    }

    #[tokio::test]
    async fn test_authorize_round_trip() {
        let manager = manager();
        let user = Uuid::new_v4();
        let (session_id, pair) = manager
            .create(user, SessionMetadata::default())
            .await
            .unwrap();

        let ctx = manager.authorize(&pair.access_token).await.unwrap();
        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.session_id, session_id);

        assert!(matches!(
            manager.authorize(&pair.refresh_token).await,
            Err(SessionError::InvalidSignature)
        ));
        assert!(matches!(
            manager.authorize("garbage").await,
            Err(SessionError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_not_mutated() {
        let store = Arc::new(MemorySessionStore::default());
        let manager = SessionManager::new(
            store.clone(),
            Arc::new(TokenManager::new("access-secret", "refresh-secret", 600, 30)),
            Arc::new(Crypto::new(light(), light()).unwrap()),
        );

        let (session_id, pair) = manager
            .create(Uuid::new_v4(), SessionMetadata::default())
            .await
            .unwrap();

        // Force the session record past its expiry window.
        let mut session = store.find(session_id).await.unwrap().unwrap();
        session.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.insert(&session).await.unwrap();

        assert!(matches!(
            manager.refresh(&pair.refresh_token).await,
            Err(SessionError::Expired)
        ));
        assert!(matches!(
            manager.authorize(&pair.access_token).await,
            Err(SessionError::Expired)
        ));

        let after = store.find(session_id).await.unwrap().unwrap();
        assert_eq!(after, session);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = manager();
        let other = manager
            .create(Uuid::new_v4(), SessionMetadata::default())
            .await
            .unwrap();

        // Well-signed token referencing a session this store never saw.
        let foreign = SessionManager::new(
            Arc::new(MemorySessionStore::default()),
            Arc::new(TokenManager::new("access-secret", "refresh-secret", 600, 30)),
            Arc::new(Crypto::new(light(), light()).unwrap()),
        );
        assert!(matches!(
            foreign.refresh(&other.1.refresh_token).await,
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            foreign.authorize(&other.1.access_token).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let manager = manager();
        let (session_id, pair) = manager
            .create(Uuid::new_v4(), SessionMetadata::default())
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            manager.refresh(&pair.refresh_token),
            manager.refresh(&pair.refresh_token),
        );

        // At most one rotation may succeed; the session never carries two
        // valid digests, and a loser leaves it revoked.
        let successes =
            [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert!(successes <= 1);

        if successes == 0 {
            assert!(
                manager
                    .store
                    .find(session_id)
                    .await
                    .unwrap()
                    .unwrap()
                    .revoked
            );
        } else {
            let winner = first.or(second).unwrap();
            let session =
                manager.store.find(session_id).await.unwrap().unwrap();
            if !session.revoked {
                assert!(
                    manager
                        .crypto
                        .tokens
                        .verify(&winner.refresh_token, &session.refresh_token_hash)
                );
            }
        }
    }

    #[tokio::test]
    async fn test_metadata_persisted() {
        let store = Arc::new(MemorySessionStore::default());
        let manager = SessionManager::new(
            store.clone(),
            Arc::new(TokenManager::new("access-secret", "refresh-secret", 600, 30)),
            Arc::new(Crypto::new(light(), light()).unwrap()),
        );

        let metadata = SessionMetadata {
            user_agent: Some("curl/8.5".to_owned()),
            ip: Some("203.0.113.9".to_owned()),
        };
        let (session_id, _) =
            manager.create(Uuid::new_v4(), metadata).await.unwrap();

        let session = store.find(session_id).await.unwrap().unwrap();
        assert_eq!(session.user_agent.as_deref(), Some("curl/8.5"));
        assert_eq!(session.ip.as_deref(), Some("203.0.113.9"));
    }
}
