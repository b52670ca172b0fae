use super::token_service_impl::map_jwt_error;
use crate::application_port::{AccessVerifier, AuthError, TokenService};
use crate::domain_model::{AccessClaims, Identity};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Verifies access tokens against the locally configured secret.
pub struct LocalSecretVerifier {
    token_service: Arc<dyn TokenService>,
}

impl LocalSecretVerifier {
    pub fn new(token_service: Arc<dyn TokenService>) -> Self {
        LocalSecretVerifier { token_service }
    }
}

#[async_trait::async_trait]
impl AccessVerifier for LocalSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.token_service.verify_access(token)?;
        Ok(Identity {
            subject_id: claims.sub,
            username: claims.username,
        })
    }
}

/// Minimum spacing between refetches triggered by an unknown `kid`.
const REFETCH_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RemoteKeySetConfig {
    pub jwks_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Verifies RS256 access tokens against a published JWK set. The set is
/// cached for `cache_ttl`. A token naming an unknown `kid` triggers a
/// refetch at most once per `REFETCH_COOLDOWN`; otherwise it is checked
/// against the cached set only.
pub struct RemoteKeySetVerifier {
    client: reqwest::Client,
    cfg: RemoteKeySetConfig,
    cache: RwLock<Option<CachedKeySet>>,
    last_refetch: Mutex<Option<Instant>>,
}

impl RemoteKeySetVerifier {
    pub fn new(cfg: RemoteKeySetConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(RemoteKeySetVerifier {
            client,
            cfg,
            cache: RwLock::new(None),
            last_refetch: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, AuthError> {
        let keys: JwkSet = self
            .client
            .get(&self.cfg.jwks_url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| {
                warn!(url = %self.cfg.jwks_url, "fetching key set: {}", e);
                AuthError::InvalidToken
            })?
            .json()
            .await
            .map_err(|e| {
                warn!(url = %self.cfg.jwks_url, "decoding key set: {}", e);
                AuthError::InvalidToken
            })?;
        debug!(keys = keys.keys.len(), "fetched key set");

        let keys = Arc::new(keys);
        *self.cache.write().await = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Returns the cached set and whether it came from the cache.
    async fn key_set(&self) -> Result<(Arc<JwkSet>, bool), AuthError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.cfg.cache_ttl {
                return Ok((cached.keys.clone(), true));
            }
        }
        Ok((self.fetch().await?, false))
    }

    /// Claims the refetch slot if the cooldown has passed.
    async fn claim_refetch(&self) -> bool {
        let mut last = self.last_refetch.lock().await;
        match *last {
            Some(at) if at.elapsed() < REFETCH_COOLDOWN => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

#[async_trait::async_trait]
impl AccessVerifier for RemoteKeySetVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        let (mut keys, from_cache) = self.key_set().await?;
        if keys.find(&kid).is_none() && from_cache {
            if self.claim_refetch().await {
                keys = self.fetch().await?;
            } else {
                debug!(kid = %kid, "unknown kid during refetch cooldown");
            }
        }
        let jwk = keys.find(&kid).ok_or(AuthError::InvalidToken)?;
        let key = DecodingKey::from_jwk(jwk).map_err(|_| AuthError::InvalidToken)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        let data = decode::<AccessClaims>(token, &key, &validation).map_err(map_jwt_error)?;
        Ok(Identity {
            subject_id: data.claims.sub,
            username: data.claims.username,
        })
    }
}
