use crate::domain_model::SubjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Identifier (`jti`) embedded in a refresh token.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn generate() -> Self {
        TokenId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: SubjectId,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: SubjectId,
    pub jti: TokenId,
    /// Missing on tokens that were not minted as refresh tokens.
    #[serde(rename = "type", default)]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn is_refresh(&self) -> bool {
        self.token_type == REFRESH_TOKEN_TYPE
    }
}

/// Output of a single issuance: one access/refresh pair plus the data the
/// refresh store needs to track the refresh half.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub token_id: TokenId,
    pub refresh_expires_at_ms: i64,
}

/// One live refresh token, as tracked by the refresh store.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RefreshRecord {
    pub token_id: TokenId,
    pub subject_id: SubjectId,
    pub expires_at_ms: i64,
}

impl RefreshRecord {
    /// Expired from `expires_at_ms` on, inclusive.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
