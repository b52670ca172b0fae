use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::application_impl::TtlSetting;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    #[serde(default)]
    pub cookie: Cookie,
    pub http: Http,
    pub log: Log,
    pub media: Media,
    #[serde(default)]
    pub stream: Stream,
}

#[derive(Clone, Deserialize)]
pub struct Auth {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl: TtlSetting,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl: TtlSetting,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub verifier: Verifier,
}

// Secrets stay out of the startup log.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verifier {
    pub backend: String, // "local" or "remote"
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default = "default_jwks_timeout_secs")]
    pub jwks_timeout_secs: u64,
    #[serde(default = "default_jwks_cache_secs")]
    pub jwks_cache_secs: u64,
}

impl Default for Verifier {
    fn default() -> Self {
        Verifier {
            backend: "local".to_string(),
            jwks_url: None,
            jwks_timeout_secs: default_jwks_timeout_secs(),
            jwks_cache_secs: default_jwks_cache_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_same_site")]
    pub same_site: String, // "Strict", "Lax" or "None"
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
}

impl Default for Cookie {
    fn default() -> Self {
        Cookie {
            domain: None,
            secure: false,
            same_site: default_same_site(),
            auth_path: default_auth_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    pub base_dir: String,
    #[serde(default = "default_movies_dir")]
    pub movies_dir: String,
    #[serde(default = "default_series_dir")]
    pub series_dir: String,
    #[serde(default = "default_video_path")]
    pub video_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stream {
    #[serde(default = "default_chunk_base")]
    pub chunk_base: u64,
    #[serde(default = "default_chunk_exponent")]
    pub chunk_exponent: u32,
}

impl Default for Stream {
    fn default() -> Self {
        Stream {
            chunk_base: default_chunk_base(),
            chunk_exponent: default_chunk_exponent(),
        }
    }
}

impl Stream {
    /// Maximum number of bytes past `start` a single Range response may reach.
    pub fn chunk_size(&self) -> Result<u64> {
        self.chunk_base
            .checked_pow(self.chunk_exponent)
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                anyhow!(
                    "stream chunk size {}^{} is not a positive u64",
                    self.chunk_base,
                    self.chunk_exponent
                )
            })
    }
}

fn default_access_ttl() -> TtlSetting {
    TtlSetting::Text("15m".to_string())
}

fn default_refresh_ttl() -> TtlSetting {
    TtlSetting::Text("180d".to_string())
}

fn default_user_id() -> String {
    "user-1".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_jwks_timeout_secs() -> u64 {
    5
}

fn default_jwks_cache_secs() -> u64 {
    60 * 60
}

fn default_same_site() -> String {
    "Lax".to_string()
}

fn default_auth_path() -> String {
    "/auth".to_string()
}

fn default_movies_dir() -> String {
    "Movies".to_string()
}

fn default_series_dir() -> String {
    "Series".to_string()
}

fn default_video_path() -> String {
    "/videos".to_string()
}

fn default_chunk_base() -> u64 {
    10
}

fn default_chunk_exponent() -> u32 {
    6
}

impl Settings {
    /// Rejects configurations that would start the server in an insecure or
    /// half-configured state.
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.access_secret.trim().is_empty() {
            bail!("auth.access_secret must be set");
        }
        if auth.refresh_secret.trim().is_empty() {
            bail!("auth.refresh_secret must be set");
        }
        if auth.access_secret == auth.refresh_secret {
            bail!("auth.access_secret and auth.refresh_secret must differ");
        }
        if auth.username.is_empty() || auth.user_id.is_empty() {
            bail!("auth.username and auth.user_id must be set");
        }
        let has_hash = auth.password_hash.as_deref().is_some_and(|h| !h.is_empty());
        let has_password = auth.password.as_deref().is_some_and(|p| !p.is_empty());
        if !has_hash && !has_password {
            bail!("one of auth.password_hash or auth.password must be set");
        }

        match auth.verifier.backend.as_str() {
            "local" => {}
            "remote" => {
                if auth.verifier.jwks_url.as_deref().is_none_or(str::is_empty) {
                    bail!("auth.verifier.jwks_url is required for the remote backend");
                }
            }
            other => bail!("unknown verifier backend: {}", other),
        }

        match self.cookie.same_site.as_str() {
            "Strict" | "Lax" | "None" => {}
            other => bail!("unknown cookie.same_site mode: {}", other),
        }
        if self.cookie.same_site == "None" && !self.cookie.secure {
            bail!("cookie.same_site = \"None\" requires cookie.secure = true");
        }

        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http.cert_path and http.key_path must be configured together");
        }
        for origin in &self.http.cors_origins {
            let uri: warp::http::Uri = origin
                .parse()
                .map_err(|e| anyhow!("invalid http.cors_origins entry {:?}: {}", origin, e))?;
            if uri.scheme().is_none() || uri.host().is_none() {
                bail!("http.cors_origins entry {:?} must be scheme://host[:port]", origin);
            }
        }

        self.stream.chunk_size()?;
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "HOMEVIDEO";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_settings() -> Settings {
        Settings {
            auth: Auth {
                access_secret: "test-access-secret".to_string(),
                refresh_secret: "test-refresh-secret".to_string(),
                access_ttl: default_access_ttl(),
                refresh_ttl: default_refresh_ttl(),
                user_id: default_user_id(),
                username: default_username(),
                password_hash: None,
                password: Some("hunter2".to_string()),
                verifier: Verifier::default(),
            },
            cookie: Cookie::default(),
            http: Http {
                address: "127.0.0.1:0".to_string(),
                cert_path: None,
                key_path: None,
                cors_origins: vec![],
            },
            log: Log {
                filter: "info".to_string(),
            },
            media: Media {
                base_dir: ".".to_string(),
                movies_dir: default_movies_dir(),
                series_dir: default_series_dir(),
                video_path: default_video_path(),
            },
            stream: Stream::default(),
        }
    }

    #[test]
    fn sample_settings_are_valid() {
        sample_settings().validate().unwrap();
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut settings = sample_settings();
        settings.auth.access_secret = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn shared_secret_is_rejected() {
        let mut settings = sample_settings();
        settings.auth.refresh_secret = settings.auth.access_secret.clone();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_credential_is_rejected() {
        let mut settings = sample_settings();
        settings.auth.password = None;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn remote_backend_requires_jwks_url() {
        let mut settings = sample_settings();
        settings.auth.verifier.backend = "remote".to_string();
        assert!(settings.validate().is_err());

        settings.auth.verifier.jwks_url = Some("https://keys.example/jwks.json".to_string());
        settings.validate().unwrap();
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let mut settings = sample_settings();
        settings.http.cert_path = Some("cert.pem".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn cors_origins_must_be_absolute() {
        let mut settings = sample_settings();
        settings.http.cors_origins = vec!["https://media.example:8443".to_string()];
        settings.validate().unwrap();

        settings.http.cors_origins = vec!["media.example".to_string()];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn chunk_size_is_power_of_base() {
        let stream = Stream::default();
        assert_eq!(stream.chunk_size().unwrap(), 1_000_000);

        let overflow = Stream {
            chunk_base: 10,
            chunk_exponent: 40,
        };
        assert!(overflow.chunk_size().is_err());
    }

    #[test]
    fn env_overrides_accept_millisecond_ttls() {
        // SAFETY: no other test in this crate reads HOMEVIDEO__ variables.
        unsafe {
            std::env::set_var("HOMEVIDEO__AUTH__ACCESS_TTL", "900000");
            std::env::set_var("HOMEVIDEO__AUTH__REFRESH_TTL", "7d");
        }
        let parsed = parse_settings(Some("settings/dev.toml"));
        unsafe {
            std::env::remove_var("HOMEVIDEO__AUTH__ACCESS_TTL");
            std::env::remove_var("HOMEVIDEO__AUTH__REFRESH_TTL");
        }

        let settings = parsed.unwrap();
        assert_eq!(settings.auth.access_ttl.to_ms(), 900_000);
        assert_eq!(settings.auth.refresh_ttl.to_ms(), 7 * 24 * 60 * 60 * 1000);
    }
}
