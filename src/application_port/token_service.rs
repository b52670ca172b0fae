use crate::application_port::AuthError;
use crate::domain_model::{AccessClaims, Identity, IssuedTokens, RefreshClaims, SubjectId};

/// Signs and verifies tokens. Holds no state beyond its keys and clock.
pub trait TokenService: Send + Sync {
    fn issue(&self, subject_id: &SubjectId, username: &str) -> Result<IssuedTokens, AuthError>;
    fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError>;
    /// Callers must still check [`RefreshClaims::is_refresh`].
    fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError>;
}

/// Verification used by the request gate; the backend is chosen at startup.
#[async_trait::async_trait]
pub trait AccessVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
