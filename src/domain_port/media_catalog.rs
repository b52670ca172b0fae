use crate::domain_model::{MediaFile, MediaKind};
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("media not found")]
    NotFound,
    #[error("media lookup failed: {0}")]
    Io(#[from] io::Error),
}

/// Resolves a route's path segments to a file on disk.
#[async_trait::async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn resolve(&self, kind: MediaKind, segments: &[&str]) -> Result<MediaFile, CatalogError>;
}
