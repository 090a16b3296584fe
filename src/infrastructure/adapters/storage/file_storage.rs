//! File Storage - 文件系统成品存储实现
//!
//! 实现 ArtifactStoragePort trait，成品写入 `{base_dir}/{logical_path}`，
//! 通过 `{public_base_url}/artifacts/{logical_path}` 对外提供访问

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ArtifactStoragePort, StoredArtifact, UploadError};

/// 把相对逻辑路径拼到根目录下，拒绝绝对路径与 `..`
pub(crate) fn safe_join(base: &Path, logical_path: &str) -> Option<PathBuf> {
    let relative = Path::new(logical_path);
    if logical_path.is_empty() {
        return None;
    }
    let mut joined = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(joined)
}

/// 文件系统成品存储
pub struct FileArtifactStorage {
    /// 存储根目录
    base_dir: PathBuf,
    /// 公开访问的 URL 前缀
    public_base_url: String,
}

impl FileArtifactStorage {
    pub async fn new(
        base_dir: impl AsRef<Path>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| UploadError::IoError(e.to_string()))?;

        Ok(Self {
            base_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn full_path(&self, logical_path: &str) -> Result<PathBuf, UploadError> {
        safe_join(&self.base_dir, logical_path)
            .ok_or_else(|| UploadError::InvalidPath(logical_path.to_string()))
    }

    fn public_url(&self, logical_path: &str) -> String {
        format!("{}/artifacts/{}", self.public_base_url, logical_path)
    }
}

#[async_trait]
impl ArtifactStoragePort for FileArtifactStorage {
    async fn store(&self, logical_path: &str, data: Vec<u8>) -> Result<StoredArtifact, UploadError> {
        let path = self.full_path(logical_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::IoError(e.to_string()))?;
        }

        // 先写临时文件再改名，避免读到写了一半的成品
        let tmp_path = path.with_extension("part");
        let size_bytes = data.len() as u64;
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| UploadError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| UploadError::IoError(e.to_string()))?;

        tracing::debug!(path = %logical_path, size = size_bytes, "Artifact stored");

        Ok(StoredArtifact {
            path: logical_path.to_string(),
            url: self.public_url(logical_path),
            size_bytes,
        })
    }

    async fn delete(&self, logical_path: &str) -> Result<(), UploadError> {
        let path = self.full_path(logical_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadError::IoError(e.to_string())),
        }
    }
}
