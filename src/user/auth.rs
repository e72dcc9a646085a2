//! Password hashing and session-token primitives.

use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::store::RecordId;

const SESSION_TOKEN_LEN: usize = 64;

/// Opaque session-token value handed out on login and looked up on every
/// protected request.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct SessionTokenValue(pub String);

impl SessionTokenValue {
    pub fn generate() -> SessionTokenValue {
        SessionTokenValue(random_token(SESSION_TOKEN_LEN))
    }
}

/// A random A-z0-9 string.
pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SessionToken {
    pub user_id: RecordId,
    pub created: i64,
    pub last_used: Option<i64>,
    pub value: SessionTokenValue,
}

mod viewvault_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum ViewVaultHasher {
    Argon2,
    /// Plain-text marker hashing for tests only. DO NOT use in production!
    #[cfg(feature = "test-fast-hasher")]
    FastInsecure,
}

impl ViewVaultHasher {
    #[cfg(not(feature = "test-fast-hasher"))]
    pub fn default_hasher() -> Self {
        ViewVaultHasher::Argon2
    }

    #[cfg(feature = "test-fast-hasher")]
    pub fn default_hasher() -> Self {
        ViewVaultHasher::FastInsecure
    }

    pub fn generate_b64_salt(&self) -> String {
        match self {
            ViewVaultHasher::Argon2 => viewvault_argon2::generate_b64_salt(),
            #[cfg(feature = "test-fast-hasher")]
            ViewVaultHasher::FastInsecure => random_token(16),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            ViewVaultHasher::Argon2 => viewvault_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            ViewVaultHasher::FastInsecure => Ok(format!(
                "fast${}${}",
                b64_salt.as_ref(),
                String::from_utf8_lossy(plain)
            )),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T, salt: T) -> Result<bool> {
        match self {
            ViewVaultHasher::Argon2 => {
                let _ = salt; // encoded in the hash string
                viewvault_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            ViewVaultHasher::FastInsecure => Ok(target_hash.as_ref()
                == format!("fast${}${}", salt.as_ref(), plain_pw.as_ref())),
        }
    }
}

impl FromStr for ViewVaultHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(ViewVaultHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "fast-insecure" => Ok(ViewVaultHasher::FastInsecure),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for ViewVaultHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewVaultHasher::Argon2 => f.write_str("argon2"),
            #[cfg(feature = "test-fast-hasher")]
            ViewVaultHasher::FastInsecure => f.write_str("fast-insecure"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PasswordCredentials {
    pub user_id: RecordId,
    pub salt: String,
    pub hash: String,
    pub hasher: ViewVaultHasher,
}

impl PasswordCredentials {
    pub fn from_plain(user_id: RecordId, password: &str) -> Result<Self> {
        let hasher = ViewVaultHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, &self.hash, &self.salt)
    }
}
