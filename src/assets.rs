use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tokio::fs;

use crate::cache::fingerprint::content_hash;

/// Local artifact storage with public URL mapping. Generated images land
/// here and are served back under the `/static` route.
#[derive(Clone, Debug)]
pub struct AssetStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl AssetStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self {
            base_dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }

    /// Collision-safe key for a freshly generated artifact, e.g.
    /// `tryon/tryon_20260806_121530_a1b2c3d4e5f6.png`.
    pub fn artifact_key(prefix: &str, seed: &str, ext: &str) -> String {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let hash = content_hash(&format!("{seed}:{nanos}"));
        format!("{prefix}/{prefix}_{timestamp}_{}.{ext}", &hash[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_writes_under_the_base_dir() {
        let dir = tempdir().unwrap();
        let storage = AssetStorage::new(
            dir.path().to_path_buf(),
            "http://localhost:8002/static".to_string(),
        );
        storage.put("tryon/result.png", b"png-bytes").await.unwrap();
        assert!(dir.path().join("tryon/result.png").exists());
    }

    #[test]
    fn public_url_joins_without_duplicate_slashes() {
        let storage = AssetStorage::new(
            PathBuf::from("/tmp/assets"),
            "http://localhost:8002/static/".to_string(),
        );
        assert_eq!(
            storage.public_url("/tryon/result.png"),
            "http://localhost:8002/static/tryon/result.png"
        );
    }

    #[test]
    fn artifact_keys_are_unique_per_call() {
        let a = AssetStorage::artifact_key("tryon", "u1", "png");
        let b = AssetStorage::artifact_key("tryon", "u1", "png");
        assert_ne!(a, b);
        assert!(a.starts_with("tryon/tryon_"));
        assert!(a.ends_with(".png"));
    }
}
