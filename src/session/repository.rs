//! PostgreSQL implementation of [`SessionStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionStore};

#[derive(Clone)]
pub struct PgSessionStore {
    pool: Pool<Postgres>,
}

impl PgSessionStore {
    /// Create a new [`PgSessionStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> Result<(), SessionError> {
        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, refresh_token_hash, user_agent, ip, revoked, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.user_agent)
        .bind(&session.ip)
        .bind(session.revoked)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let session = sqlx::query_as::<_, Session>(
            r#"SELECT id, user_id, refresh_token_hash, user_agent, ip, revoked, expires_at
                FROM sessions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn rotate(
        &self,
        id: Uuid,
        previous_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        // Conditional update on the previous digest: the row-level write
        // lock makes this the serialization point for concurrent refreshes
        // of one session.
        let result = sqlx::query(
            r#"UPDATE sessions SET refresh_token_hash = $3, expires_at = $4
                WHERE id = $1 AND refresh_token_hash = $2 AND revoked = FALSE"#,
        )
        .bind(id)
        .bind(previous_hash)
        .bind(new_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, SessionError> {
        let result = sqlx::query(
            r#"UPDATE sessions SET revoked = TRUE, refresh_token_hash = '' WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
