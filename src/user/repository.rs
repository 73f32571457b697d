//! PostgreSQL implementation of [`UserStore`].

use async_trait::async_trait;
use sqlx::{PgPool, Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::{User, UserStore};

#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, identifier, password_hash, created_at)
                VALUES ($1, $2, $3, $4)"#,
        )
        .bind(user.id)
        .bind(&user.identifier)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => ServerError::Conflict,
            _ => ServerError::Sql(err),
        })?;

        Ok(())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, identifier, password_hash, created_at
                FROM users WHERE identifier = $1"#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
