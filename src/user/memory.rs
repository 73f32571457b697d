//! In-memory [`UserStore`] used by tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, ServerError};
use crate::user::{User, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.identifier) {
            return Err(ServerError::Conflict);
        }

        users.insert(user.identifier.clone(), user.clone());
        Ok(())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(identifier).cloned())
    }
}
