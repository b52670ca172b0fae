use crate::application_port::{
    AuthError, AuthSessionService, CredentialChecker, LoginInput, TokenService,
};
use crate::domain_model::{Identity, LoginSession, RefreshRecord};
use crate::domain_port::{Clock, RefreshTokenStore, StoreError};
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CSRF_TOKEN_BYTES: usize = 32;

pub fn new_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::Store(error.to_string())
    }
}

/// Stateless orchestration over the token service and the refresh store.
pub struct RealAuthSessionService {
    token_service: Arc<dyn TokenService>,
    store: Arc<dyn RefreshTokenStore>,
    credentials: Arc<dyn CredentialChecker>,
    clock: Arc<dyn Clock>,
}

impl RealAuthSessionService {
    pub fn new(
        token_service: Arc<dyn TokenService>,
        store: Arc<dyn RefreshTokenStore>,
        credentials: Arc<dyn CredentialChecker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_service,
            store,
            credentials,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl AuthSessionService for RealAuthSessionService {
    async fn login(&self, input: LoginInput) -> Result<LoginSession, AuthError> {
        let identity = self.credentials.check(&input).await.inspect_err(|e| {
            warn!(username = %input.username, "login rejected: {}", e);
        })?;
        let session = self.create_login_session(&identity).await?;
        info!(subject = %identity.subject_id, jti = %session.token_id, "login");
        Ok(session)
    }

    async fn create_login_session(&self, identity: &Identity) -> Result<LoginSession, AuthError> {
        let issued = self
            .token_service
            .issue(&identity.subject_id, &identity.username)?;

        self.store
            .save(RefreshRecord {
                token_id: issued.token_id.clone(),
                subject_id: identity.subject_id.clone(),
                expires_at_ms: issued.refresh_expires_at_ms,
            })
            .await?;

        Ok(LoginSession {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            token_id: issued.token_id,
            csrf_token: new_csrf_token(),
            refresh_expires_at_ms: issued.refresh_expires_at_ms,
        })
    }

    async fn rotate_refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<LoginSession, AuthError> {
        // A bad signature and a lapsed `exp` are reported alike; only the
        // store decides between revoked and expired.
        let claims = self
            .token_service
            .verify_refresh(refresh_token)
            .map_err(|e| match e {
                AuthError::ExpiredToken => AuthError::InvalidToken,
                other => other,
            })?;
        if !claims.is_refresh() {
            return Err(AuthError::InvalidToken);
        }

        // Consume before issuing: a replayed or concurrently presented token
        // finds nothing here.
        let Some(record) = self.store.take(&claims.jti).await? else {
            warn!(subject = %claims.sub, jti = %claims.jti, "refresh token reused or revoked");
            return Err(AuthError::RevokedToken);
        };
        if record.subject_id != claims.sub {
            warn!(jti = %claims.jti, "refresh record owner mismatch");
            return Err(AuthError::RevokedToken);
        }
        if record.is_expired(self.clock.now_ms()) {
            debug!(jti = %claims.jti, "refresh record expired");
            return Err(AuthError::ExpiredToken);
        }

        let identity = self
            .credentials
            .lookup(&claims.sub)
            .ok_or(AuthError::RevokedToken)?;
        let session = self.create_login_session(&identity).await?;
        info!(subject = %identity.subject_id, old = %claims.jti, new = %session.token_id, "refresh token rotated");
        Ok(session)
    }

    async fn revoke_refresh_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self.token_service.verify_refresh(refresh_token) {
            Ok(claims) => {
                if let Err(e) = self.store.delete(&claims.jti).await {
                    warn!(jti = %claims.jti, "revoking refresh token: {}", e);
                } else {
                    info!(subject = %claims.sub, jti = %claims.jti, "refresh token revoked");
                }
            }
            Err(e) => debug!("ignoring unverifiable refresh token on logout: {}", e),
        }
        Ok(())
    }
}
