use crate::domain_model::{AccessToken, RefreshToken, TokenId};

/// Produced once per login or rotation and handed straight to the cookie
/// boundary; never stored.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub token_id: TokenId,
    pub csrf_token: String,
    pub refresh_expires_at_ms: i64,
}
