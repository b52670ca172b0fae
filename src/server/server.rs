use crate::api::CookiePolicy;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{Identity, SubjectId};
use crate::domain_port::*;
use crate::infra::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub struct Server {
    pub auth_sessions: Arc<dyn AuthSessionService>,
    pub access_verifier: Arc<dyn AccessVerifier>,
    pub cookie_policy: Arc<CookiePolicy>,
    pub media_catalog: Arc<dyn MediaCatalog>,
    pub range_policy: Arc<RangePolicy>,
    pub stream_pump: Arc<StreamPump>,
    pub video_path: Arc<str>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let auth = &settings.auth;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
            JwtConfig {
                access_secret: auth.access_secret.clone().into_bytes(),
                refresh_secret: auth.refresh_secret.clone().into_bytes(),
                access_ttl_ms: auth.access_ttl.to_ms(),
                refresh_ttl_ms: auth.refresh_ttl.to_ms(),
            },
            clock.clone(),
        ));
        if auth.access_ttl.to_ms() == 0 || auth.refresh_ttl.to_ms() == 0 {
            warn!("a token ttl parsed to zero; tokens of that kind are issued already expired");
        }

        let access_verifier: Arc<dyn AccessVerifier> = match auth.verifier.backend.as_str() {
            "local" => Arc::new(LocalSecretVerifier::new(token_service.clone())),
            "remote" => {
                let jwks_url = auth
                    .verifier
                    .jwks_url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("auth.verifier.jwks_url is not set"))?;
                Arc::new(RemoteKeySetVerifier::new(RemoteKeySetConfig {
                    jwks_url,
                    timeout: Duration::from_secs(auth.verifier.jwks_timeout_secs),
                    cache_ttl: Duration::from_secs(auth.verifier.jwks_cache_secs),
                })?)
            }
            other => return Err(anyhow::anyhow!("Unknown verifier backend: {}", other)),
        };

        let secret = match (&auth.password_hash, &auth.password) {
            (Some(hash), _) if !hash.is_empty() => PasswordSecret::Hash(hash.clone()),
            (_, Some(password)) => PasswordSecret::Plain(password.clone()),
            _ => return Err(anyhow::anyhow!("no credential configured")),
        };
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let credentials: Arc<dyn CredentialChecker> = Arc::new(ConfiguredCredentials::new(
            Identity {
                subject_id: SubjectId(auth.user_id.clone()),
                username: auth.username.clone(),
            },
            secret,
            credential_hasher,
        ));

        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth_sessions: Arc<dyn AuthSessionService> = Arc::new(RealAuthSessionService::new(
            token_service,
            refresh_store.clone(),
            credentials,
            clock.clone(),
        ));

        let cookie_policy = Arc::new(CookiePolicy::try_new(&settings.cookie, clock.clone())?);

        let media = &settings.media;
        let media_catalog: Arc<dyn MediaCatalog> = Arc::new(FsMediaCatalog::new(
            &media.base_dir,
            &media.movies_dir,
            &media.series_dir,
        ));
        let range_policy = Arc::new(RangePolicy::new(settings.stream.chunk_size()?));
        let stream_pump = Arc::new(StreamPump::default());

        // region runtime infra
        let cancel = CancellationToken::new();
        let sweeper_handle = tokio::spawn(sweep_refresh_store(
            refresh_store,
            clock,
            cancel.clone(),
        ));
        // endregion

        info!(
            verifier = %auth.verifier.backend,
            chunk_size = range_policy.chunk_size,
            "server started"
        );

        Ok(Self {
            auth_sessions,
            access_verifier,
            cookie_policy,
            media_catalog,
            range_policy,
            stream_pump,
            video_path: Arc::from(media.video_path.as_str()),
            sweeper_handle: Mutex::new(Some(sweeper_handle)),
            cancel,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.sweeper_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("sweeper handle dropped: {:?}", r);
        }
    }
}

async fn sweep_refresh_store(
    store: Arc<InMemoryRefreshTokenStore>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let pruned = store.prune_expired(clock.now_ms());
                if pruned > 0 {
                    debug!(pruned, remaining = store.len(), "pruned expired refresh records");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::tests::sample_settings;

    #[tokio::test]
    async fn builds_and_shuts_down() {
        let server = Server::try_new(&sample_settings()).await.unwrap();
        assert_eq!(server.range_policy.chunk_size, 1_000_000);
        assert_eq!(&*server.video_path, "/videos");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn remote_verifier_backend_is_selected_from_settings() {
        let mut settings = sample_settings();
        settings.auth.verifier.backend = "remote".to_string();
        settings.auth.verifier.jwks_url = Some("http://127.0.0.1:9/jwks.json".to_string());
        let server = Server::try_new(&settings).await.unwrap();

        // No key set is reachable, so every token is refused.
        assert!(server.access_verifier.verify("a.b.c").await.is_err());
        server.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_settings_are_refused() {
        let mut settings = sample_settings();
        settings.auth.refresh_secret = settings.auth.access_secret.clone();
        assert!(Server::try_new(&settings).await.is_err());
    }
}
