use crate::domain_model::{MediaFile, MediaKind};
use crate::domain_port::{CatalogError, MediaCatalog};
use std::path::{Path, PathBuf};

/// Resolves media routes against the configured library folders.
pub struct FsMediaCatalog {
    movies_root: PathBuf,
    series_root: PathBuf,
}

impl FsMediaCatalog {
    pub fn new(base_dir: impl AsRef<Path>, movies_dir: &str, series_dir: &str) -> Self {
        let base_dir = base_dir.as_ref();
        FsMediaCatalog {
            movies_root: base_dir.join(movies_dir),
            series_root: base_dir.join(series_dir),
        }
    }

    fn root(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Movie => &self.movies_root,
            MediaKind::Series => &self.series_root,
        }
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("vtt") => "text/vtt",
        Some("srt") => "application/x-subrip",
        _ => "application/octet-stream",
    }
}

#[async_trait::async_trait]
impl MediaCatalog for FsMediaCatalog {
    async fn resolve(&self, kind: MediaKind, segments: &[&str]) -> Result<MediaFile, CatalogError> {
        if segments.is_empty() || !segments.iter().all(|s| is_plain_segment(s)) {
            return Err(CatalogError::NotFound);
        }

        let mut path = self.root(kind).to_path_buf();
        path.extend(segments);

        let meta = tokio::fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(CatalogError::NotFound);
        }

        Ok(MediaFile {
            content_type: content_type_for(&path),
            size: meta.len(),
            path,
        })
    }
}
