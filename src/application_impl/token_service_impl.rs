use crate::application_port::{AuthError, TokenService};
use crate::domain_model::{
    AccessClaims, AccessToken, IssuedTokens, REFRESH_TOKEN_TYPE, RefreshClaims, RefreshToken,
    SubjectId, TokenId,
};
use crate::domain_port::Clock;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_ttl_ms", &self.access_ttl_ms)
            .field("refresh_ttl_ms", &self.refresh_ttl_ms)
            .finish_non_exhaustive()
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        KeyPair {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HS256 tokens. Access and refresh tokens are signed with separate secrets,
/// so one kind never verifies as the other.
pub struct JwtTokenService {
    access_keys: KeyPair,
    refresh_keys: KeyPair,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        JwtTokenService {
            access_keys: KeyPair::from_secret(&cfg.access_secret),
            refresh_keys: KeyPair::from_secret(&cfg.refresh_secret),
            access_ttl_ms: i64::try_from(cfg.access_ttl_ms).unwrap_or(i64::MAX),
            refresh_ttl_ms: i64::try_from(cfg.refresh_ttl_ms).unwrap_or(i64::MAX),
            clock,
        }
    }

    fn validation() -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.leeway = 0;
        v
    }
}

fn sign<T: serde::Serialize>(claims: &T, keys: &KeyPair) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

pub(crate) fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    }
}

/// `exp` for a token that must be rejected from `expires_at_ms` on. A JWT
/// stays valid through its whole `exp` second, so the claim is the last
/// second that ends no later than the expiry instant.
fn exp_claim(expires_at_ms: i64) -> i64 {
    expires_at_ms.div_euclid(1000) - 1
}

fn verify<T: DeserializeOwned>(token: &str, keys: &KeyPair) -> Result<T, AuthError> {
    let data = decode::<T>(token, &keys.decoding, &JwtTokenService::validation())
        .map_err(map_jwt_error)?;
    Ok(data.claims)
}

impl TokenService for JwtTokenService {
    fn issue(&self, subject_id: &SubjectId, username: &str) -> Result<IssuedTokens, AuthError> {
        let now_ms = self.clock.now_ms();
        let iat = now_ms / 1000;

        let access = AccessClaims {
            sub: subject_id.clone(),
            username: username.to_string(),
            iat,
            exp: exp_claim(now_ms.saturating_add(self.access_ttl_ms)),
        };
        let access_token = sign(&access, &self.access_keys)?;

        let token_id = TokenId::generate();
        let refresh_expires_at_ms = now_ms.saturating_add(self.refresh_ttl_ms);
        let refresh = RefreshClaims {
            sub: subject_id.clone(),
            jti: token_id.clone(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            iat,
            exp: exp_claim(refresh_expires_at_ms),
        };
        let refresh_token = sign(&refresh, &self.refresh_keys)?;

        Ok(IssuedTokens {
            access_token: AccessToken(access_token),
            refresh_token: RefreshToken(refresh_token),
            token_id,
            refresh_expires_at_ms,
        })
    }

    fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        verify(token, &self.access_keys)
    }

    fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        verify(token, &self.refresh_keys)
    }
}
