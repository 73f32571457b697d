//! In-memory [`SessionStore`] used by tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionStore};

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn rotate(
        &self,
        id: Uuid,
        previous_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&id) {
            Some(session)
                if !session.revoked
                    && session.refresh_token_hash == previous_hash =>
            {
                session.refresh_token_hash = new_hash.to_owned();
                session.expires_at = expires_at;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&id) {
            Some(session) => {
                session.revoked = true;
                session.refresh_token_hash = String::new();
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(hash: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_hash: hash.to_owned(),
            user_agent: None,
            ip: None,
            revoked: false,
            expires_at: Utc::now() + chrono::Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_rotate_is_conditional() {
        let store = MemorySessionStore::default();
        let session = session("digest-1");
        store.insert(&session).await.unwrap();

        let later = Utc::now() + chrono::Duration::days(30);
        assert!(
            store
                .rotate(session.id, "digest-1", "digest-2", later)
                .await
                .unwrap()
        );
        // Stale digest loses the race.
        assert!(
            !store
                .rotate(session.id, "digest-1", "digest-3", later)
                .await
                .unwrap()
        );

        let stored = store.find(session.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash, "digest-2");
    }

    #[tokio::test]
    async fn test_revoke_clears_digest() {
        let store = MemorySessionStore::default();
        let session = session("digest-1");
        store.insert(&session).await.unwrap();

        assert!(store.revoke(session.id).await.unwrap());
        // Idempotent on an existing, already revoked session.
        assert!(store.revoke(session.id).await.unwrap());
        assert!(!store.revoke(Uuid::new_v4()).await.unwrap());

        let stored = store.find(session.id).await.unwrap().unwrap();
        assert!(stored.revoked);
        assert!(stored.refresh_token_hash.is_empty());

        // No rotation out of the terminal state.
        let later = Utc::now() + chrono::Duration::days(30);
        assert!(!store.rotate(session.id, "", "digest-2", later).await.unwrap());
    }
}
