pub mod info;
pub mod logout;
pub mod refresh;
pub mod signin;
pub mod signup;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// JSON body extractor running DTO validation before the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        body.validate()?;

        Ok(Valid(body))
    }
}

#[cfg(test)]
pub(crate) fn state() -> crate::AppState {
    use std::sync::Arc;

    use crate::config::{Argon2, Configuration};
    use crate::crypto::Crypto;
    use crate::session::{SessionManager, memory::MemorySessionStore};
    use crate::token::TokenManager;
    use crate::user::memory::MemoryUserStore;

    let light = Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    };
    let crypto =
        Arc::new(Crypto::new(Some(light.clone()), Some(light)).unwrap());
    let tokens = Arc::new(TokenManager::new(
        "test-access-secret",
        "test-refresh-secret",
        600,
        30,
    ));

    crate::AppState {
        config: Arc::new(Configuration::default()),
        crypto: crypto.clone(),
        users: Arc::new(MemoryUserStore::default()),
        sessions: SessionManager::new(
            Arc::new(MemorySessionStore::default()),
            tokens,
            crypto,
        ),
    }
}
