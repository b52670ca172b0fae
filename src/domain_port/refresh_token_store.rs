use crate::domain_model::{RefreshRecord, TokenId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached. The in-memory store never
    /// fails; durable adapters report connection and query errors here.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Tracks live refresh tokens by `jti`.
///
/// Expiry is not enforced here; callers compare `expires_at_ms` against their
/// clock after a lookup.
#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, record: RefreshRecord) -> Result<(), StoreError>;
    async fn get(&self, token_id: &TokenId) -> Result<Option<RefreshRecord>, StoreError>;
    async fn delete(&self, token_id: &TokenId) -> Result<(), StoreError>;
    /// Removes and returns the record in one step. Of any number of
    /// concurrent calls for the same id, at most one observes `Some`.
    async fn take(&self, token_id: &TokenId) -> Result<Option<RefreshRecord>, StoreError>;
}
