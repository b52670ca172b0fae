use crate::domain_model::{Identity, LoginSession, SubjectId};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing token")]
    MissingToken,
    #[error("token invalid")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token revoked")]
    RevokedToken,
    #[error("csrf token mismatch")]
    CsrfMismatch,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginInput")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialChecker: Send + Sync {
    /// Returns the identity owning the credentials, or `InvalidCredentials`.
    async fn check(&self, input: &LoginInput) -> Result<Identity, AuthError>;
    /// Looks up a known subject, used when re-issuing tokens on rotation.
    fn lookup(&self, subject_id: &SubjectId) -> Option<Identity>;
}

/// Login, rotation and revocation over the token service and refresh store.
#[async_trait::async_trait]
pub trait AuthSessionService: Send + Sync {
    async fn login(&self, input: LoginInput) -> Result<LoginSession, AuthError>;
    async fn create_login_session(&self, identity: &Identity) -> Result<LoginSession, AuthError>;
    /// Consumes `refresh_token` and returns a fresh session. A refresh token
    /// can be rotated at most once.
    async fn rotate_refresh_session(&self, refresh_token: &str)
    -> Result<LoginSession, AuthError>;
    /// Best effort; an already invalid token is not an error.
    async fn revoke_refresh_session(&self, refresh_token: &str) -> Result<(), AuthError>;
}
