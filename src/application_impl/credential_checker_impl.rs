use crate::application_port::{AuthError, CredentialChecker, CredentialHasher, LoginInput};
use crate::domain_model::{Identity, SubjectId};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {}", e))),
        }
    }
}

pub enum PasswordSecret {
    /// Argon2 PHC string.
    Hash(String),
    Plain(String),
}

/// The single configured account.
pub struct ConfiguredCredentials {
    identity: Identity,
    secret: PasswordSecret,
    hasher: Arc<dyn CredentialHasher>,
}

impl ConfiguredCredentials {
    pub fn new(identity: Identity, secret: PasswordSecret, hasher: Arc<dyn CredentialHasher>) -> Self {
        ConfiguredCredentials {
            identity,
            secret,
            hasher,
        }
    }
}

fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[async_trait::async_trait]
impl CredentialChecker for ConfiguredCredentials {
    async fn check(&self, input: &LoginInput) -> Result<Identity, AuthError> {
        if input.username.is_empty() || input.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if !ct_eq(&input.username, &self.identity.username) {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = match &self.secret {
            PasswordSecret::Hash(hash) => {
                self.hasher.verify_password(&input.password, hash).await?
            }
            PasswordSecret::Plain(password) => ct_eq(&input.password, password),
        };
        if !ok {
            warn!(username = %input.username, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.identity.clone())
    }

    fn lookup(&self, subject_id: &SubjectId) -> Option<Identity> {
        (subject_id == &self.identity.subject_id).then(|| self.identity.clone())
    }
}
