use crate::domain_model::{RefreshRecord, SubjectId, TokenId};
use crate::domain_port::{RefreshTokenStore, StoreError};
use dashmap::DashMap;

/// Process-lifetime refresh store. Records vanish on restart, which logs
/// every session out.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    records: DashMap<TokenId, (SubjectId, i64)>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops records that have expired at `now_ms` and returns how many
    /// went. Lookups already treat such records as expired; this only bounds
    /// memory for tokens that are never presented again.
    pub fn prune_expired(&self, now_ms: i64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, (_, expires_at_ms)| *expires_at_ms > now_ms);
        before.saturating_sub(self.records.len())
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn save(&self, record: RefreshRecord) -> Result<(), StoreError> {
        self.records
            .insert(record.token_id, (record.subject_id, record.expires_at_ms));
        Ok(())
    }

    async fn get(&self, token_id: &TokenId) -> Result<Option<RefreshRecord>, StoreError> {
        Ok(self.records.get(token_id).map(|entry| {
            let (subject_id, expires_at_ms) = entry.value();
            RefreshRecord {
                token_id: token_id.clone(),
                subject_id: subject_id.clone(),
                expires_at_ms: *expires_at_ms,
            }
        }))
    }

    async fn delete(&self, token_id: &TokenId) -> Result<(), StoreError> {
        self.records.remove(token_id);
        Ok(())
    }

    async fn take(&self, token_id: &TokenId) -> Result<Option<RefreshRecord>, StoreError> {
        Ok(self
            .records
            .remove(token_id)
            .map(|(token_id, (subject_id, expires_at_ms))| RefreshRecord {
                token_id,
                subject_id,
                expires_at_ms,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(id: &str) -> RefreshRecord {
        RefreshRecord {
            token_id: TokenId(id.to_string()),
            subject_id: SubjectId::from("user-1"),
            expires_at_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn save_get_delete() {
        let store = InMemoryRefreshTokenStore::new();
        store.save(record("a")).await.unwrap();

        let found = store.get(&TokenId("a".to_string())).await.unwrap();
        assert_eq!(found, Some(record("a")));

        store.delete(&TokenId("a".to_string())).await.unwrap();
        assert_eq!(store.get(&TokenId("a".to_string())).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_no_op() {
        let store = InMemoryRefreshTokenStore::new();
        store.delete(&TokenId("missing".to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn prune_drops_only_expired_records() {
        let store = InMemoryRefreshTokenStore::new();
        store.save(record("old")).await.unwrap();
        store
            .save(RefreshRecord {
                expires_at_ms: 5_000,
                ..record("fresh")
            })
            .await
            .unwrap();

        assert_eq!(store.prune_expired(2_000), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&TokenId("fresh".to_string())).await.unwrap().is_some());

        assert_eq!(store.prune_expired(5_000), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn take_hands_out_a_record_once() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        store.save(record("once")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.take(&TokenId("once".to_string())).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(store.is_empty());
    }
}
