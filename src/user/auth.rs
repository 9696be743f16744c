//! Authentication primitives: session tokens and password hashing

use anyhow::{bail, Result};

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::time::SystemTime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct SessionTokenValue(pub String);

impl SessionTokenValue {
    pub fn generate() -> SessionTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        SessionTokenValue(random_string)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SessionToken {
    pub user_id: String,
    pub value: SessionTokenValue,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

impl SessionToken {
    pub fn issue(user_id: &str) -> Self {
        SessionToken {
            user_id: user_id.to_string(),
            value: SessionTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        }
    }
}

mod gamehub_argon2 {
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

// Cheap salted sha2 for tests only, argon2 dominates e2e runtime otherwise.
#[cfg(feature = "test-fast-hasher")]
mod gamehub_fast_sha2 {
    use sha2::{Digest, Sha256};

    pub fn hash(plain: &[u8], salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(plain);
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum CredentialHasher {
    Argon2,
    #[cfg(feature = "test-fast-hasher")]
    FastSha2,
}

impl CredentialHasher {
    /// The hasher new credentials are created with.
    pub fn default_hasher() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        return CredentialHasher::FastSha2;
        #[cfg(not(feature = "test-fast-hasher"))]
        CredentialHasher::Argon2
    }

    pub fn generate_b64_salt(&self) -> String {
        gamehub_argon2::generate_b64_salt()
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            CredentialHasher::Argon2 => gamehub_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha2 => Ok(gamehub_fast_sha2::hash(plain, b64_salt.as_ref())),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T, salt: T) -> Result<bool> {
        match self {
            CredentialHasher::Argon2 => {
                let _ = salt; // argon2 hashes embed their salt
                gamehub_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha2 => Ok(gamehub_fast_sha2::hash(
                plain_pw.as_ref().as_bytes(),
                salt.as_ref(),
            ) == target_hash.as_ref()),
        }
    }
}

impl FromStr for CredentialHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(CredentialHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "fast-sha2" => Ok(CredentialHasher::FastSha2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha2 => write!(f, "fast-sha2"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UsernamePasswordCredentials {
    pub user_id: String,
    pub salt: String,
    pub hash: String,
    pub hasher: CredentialHasher,

    pub created: SystemTime,
    pub last_tried: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

impl UsernamePasswordCredentials {
    pub fn from_plain_password(user_id: &str, password: &str) -> Result<Self> {
        let hasher = CredentialHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id: user_id.to_string(),
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, &self.hash, &self.salt)
    }
}
