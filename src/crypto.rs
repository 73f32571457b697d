//! Cryptographic logics: password hashing and refresh credential digests.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Cryptographic manager.
pub struct Crypto {
    pub pwd: PasswordManager,
    pub tokens: TokenHasher,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(
        password_config: Option<ArgonConfig>,
        token_config: Option<ArgonConfig>,
    ) -> Result<Self> {
        Ok(Self {
            pwd: PasswordManager::new(password_config)?,
            tokens: TokenHasher::new(token_config)?,
        })
    }
}

fn argon2(params: Params) -> Argon2<'static> {
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
}

fn params(config: ArgonConfig) -> Result<Params> {
    Params::new(
        config.memory_cost,
        config.iterations,
        config.parallelism,
        Some(config.hash_length),
    )
    .map_err(|err| CryptoError::Argon2(err.to_string()))
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        Ok(Self {
            params: params(config.unwrap_or_default())?,
        })
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2(self.params.clone())
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC string.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> bool {
        let Ok(parsed) = PasswordHash::new(phc_hash) else {
            return false;
        };

        argon2(self.params.clone())
            .verify_password(password.as_ref(), &parsed)
            .is_ok()
    }
}

/// One-way, salted digests for refresh credentials.
///
/// Digests are salted, so two calls over the same token never produce the
/// same string: equality checks must go through [`TokenHasher::verify`].
/// An empty stored digest means "no valid refresh credential" and never
/// matches a presented token.
pub struct TokenHasher {
    params: Params,
}

impl TokenHasher {
    /// Create a new [`TokenHasher`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        Ok(Self {
            params: params(config.unwrap_or_else(ArgonConfig::token_digest))?,
        })
    }

    /// Digest a credential for storage.
    pub fn hash(&self, token: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = argon2(self.params.clone())
            .hash_password(token.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Check a presented credential against a stored digest.
    pub fn verify(&self, token: impl AsRef<[u8]>, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };

        argon2(self.params.clone())
            .verify_password(token.as_ref(), &parsed)
            .is_ok()
    }
}
