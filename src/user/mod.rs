//! User accounts: the owning side of sessions.

#[cfg(test)]
pub(crate) mod memory;
mod repository;

pub use repository::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Unique login identifier, an email address or phone number.
    pub identifier: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new account with an already-hashed password.
    pub fn new(identifier: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Persistence port for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`crate::error::ServerError::Conflict`]
    /// when the identifier is already taken.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Find a user by login identifier.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;
}
