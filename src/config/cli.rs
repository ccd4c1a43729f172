use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// 本機檔案系統；相對路徑以 `base_path` 為起點，絕對路徑直接使用
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().display().to_string());

        storage.write_file("out/nested/a.json", b"{}").await.unwrap();
        assert!(storage.exists("out/nested/a.json").await);
        assert_eq!(storage.read_file("out/nested/a.json").await.unwrap(), b"{}");
        assert!(!storage.exists("missing.csv").await);
    }

    #[tokio::test]
    async fn test_absolute_paths_bypass_base() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("terms.csv");
        std::fs::write(&file, "a,b").unwrap();

        let storage = LocalStorage::new("/nonexistent-base".to_string());
        let data = storage.read_file(&file.display().to_string()).await.unwrap();
        assert_eq!(data, b"a,b");
    }
}
