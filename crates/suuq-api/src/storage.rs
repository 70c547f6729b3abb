use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use suuq_types::models::Bucket;

/// Public upload storage on local disk.
///
/// Files live at `{dir}/{bucket}/{user_id}/{name}` and are served read-only
/// under `/storage/{bucket}/...`.
pub struct Storage {
    dir: PathBuf,
}

/// A stored upload.
pub struct StoredFile {
    /// Path inside the bucket, `{user_id}/{name}`.
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        for bucket in [Bucket::AdImages, Bucket::CvFiles] {
            fs::create_dir_all(dir.join(bucket.as_str())).await?;
        }
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        &self.dir
    }

    /// Resolve a bucket-relative path, refusing anything that climbs out.
    fn file_path(&self, bucket: Bucket, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.dir.join(bucket.as_str()).join(relative))
    }

    /// Write `data` under `relative` and return its size and SHA-256.
    pub async fn save(&self, bucket: Bucket, relative: &str, data: &[u8]) -> Result<StoredFile> {
        let path = self
            .file_path(bucket, relative)
            .ok_or_else(|| anyhow::anyhow!("Invalid upload path {}", relative))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(StoredFile {
            path: relative.to_string(),
            size: data.len() as u64,
            sha256,
        })
    }

    /// Delete a stored file. Returns false when it was already gone.
    pub async fn delete(&self, bucket: Bucket, relative: &str) -> Result<bool> {
        let path = self
            .file_path(bucket, relative)
            .ok_or_else(|| anyhow::anyhow!("Invalid upload path {}", relative))?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted upload {}/{}", bucket, relative);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {}/{} already gone", bucket, relative);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path().to_path_buf()).await.unwrap();

        let stored = storage.save(Bucket::AdImages, "u1/a.png", b"png bytes").await.unwrap();
        assert_eq!(stored.size, 9);
        assert_eq!(stored.sha256.len(), 64);
        assert!(tmp.path().join("ad-images/u1/a.png").exists());

        assert!(storage.delete(Bucket::AdImages, "u1/a.png").await.unwrap());
        assert!(!storage.delete(Bucket::AdImages, "u1/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn refuses_escaping_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path().to_path_buf()).await.unwrap();
        assert!(storage.save(Bucket::CvFiles, "../evil.pdf", b"x").await.is_err());
        assert!(storage.save(Bucket::CvFiles, "/etc/passwd", b"x").await.is_err());
    }
}
