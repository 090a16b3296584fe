//! File Asset Store - 文件系统背景音乐素材库
//!
//! 目录布局：`{root}/{Category}/{Category}_{n}.{ext}`，
//! 素材通过 `{public_base_url}/assets/{path}` 对外提供访问

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AssetStoreError, AssetStorePort};
use crate::infrastructure::adapters::storage::safe_join;

/// 文件系统素材库
pub struct FileAssetStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileAssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, AssetStoreError> {
        safe_join(&self.root, path).ok_or_else(|| AssetStoreError::InvalidPath(path.to_string()))
    }

    /// 目录下的文件名，忽略子目录与隐藏文件
    async fn list_files(&self, dir: &Path) -> Result<Vec<String>, AssetStoreError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetStoreError::NotFound(dir.display().to_string()))
            }
            Err(e) => return Err(AssetStoreError::IoError(e.to_string())),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AssetStoreError::IoError(e.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AssetStoreError::IoError(e.to_string()))?;
            if file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl AssetStorePort for FileAssetStore {
    async fn list_assets_in_category(&self, category: &str) -> Result<Vec<String>, AssetStoreError> {
        let dir = self.full_path(category)?;
        self.list_files(&dir).await
    }

    async fn exists(&self, path: &str) -> bool {
        match self.full_path(path) {
            Ok(full) => fs::metadata(full).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("{}/assets/{}", self.public_base_url, path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetStoreError> {
        let full = self.full_path(path)?;
        match fs::read(&full).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetStoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(AssetStoreError::IoError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn layout() -> (tempfile::TempDir, FileAssetStore) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Calm")).unwrap();
        std::fs::create_dir_all(dir.path().join("Horror")).unwrap();
        std::fs::write(dir.path().join("Calm/Calm_1.mp3"), b"calm").unwrap();
        std::fs::write(dir.path().join("Calm/calm_2.mp3"), b"calm2").unwrap();
        std::fs::write(dir.path().join("fallback.mp3"), b"fb").unwrap();
        let store = FileAssetStore::new(dir.path(), "http://localhost:5060/");
        (dir, store)
    }

    #[tokio::test]
    async fn test_listing() {
        let (_dir, store) = layout();
        assert_eq!(
            store.list_assets_in_category("Calm").await.unwrap(),
            vec!["Calm_1.mp3", "calm_2.mp3"]
        );
        assert!(store.list_assets_in_category("Horror").await.unwrap().is_empty());
        assert!(matches!(
            store.list_assets_in_category("Sad").await,
            Err(AssetStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_exists_and_read() {
        let (_dir, store) = layout();
        assert!(store.exists("Calm/Calm_1.mp3").await);
        assert!(store.exists("fallback.mp3").await);
        assert!(!store.exists("Calm").await);
        assert!(!store.exists("../etc/passwd").await);
        assert_eq!(store.read("Calm/calm_2.mp3").await.unwrap(), b"calm2");
        assert!(matches!(
            store.read("Calm/Calm_9.mp3").await,
            Err(AssetStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read("../secret").await,
            Err(AssetStoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_resolve_url() {
        let store = FileAssetStore::new("/assets", "http://cdn.example.com/");
        assert_eq!(
            store.resolve_url("Calm/Calm_1.mp3"),
            "http://cdn.example.com/assets/Calm/Calm_1.mp3"
        );
    }
}
