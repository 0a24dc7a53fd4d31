//! Upload storage
//!
//! Files are written under the configured upload directory with a generated
//! name. A [`StoredFile`] removes its file when dropped unless it was
//! [`StoredFile::keep`]-ed, so every early return after the write cleans up.

use crate::config::UploadConfig;
use crate::errors::{AppError, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lower-cased extension of an uploaded file name, if any
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Strip any directory components a client put into the file name
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
    import_extensions: Vec<String>,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_upload_bytes,
            import_extensions: config
                .import_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if needed
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Extension of an import file, rejected unless allow-listed
    pub fn check_import_extension(&self, file_name: &str) -> Result<String> {
        let extension = extension_of(file_name).unwrap_or_default();
        if self.import_extensions.iter().any(|e| e == &extension) {
            Ok(extension)
        } else {
            Err(AppError::UnsupportedFileType { extension })
        }
    }

    /// Write `bytes` under a fresh name
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        self.check_size(bytes.len())?;
        self.ensure_dir().await?;

        let stored_name = match extension_of(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.dir.join(&stored_name);

        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Upload stored");

        Ok(StoredFile {
            path,
            stored_name,
            size: bytes.len(),
            keep: false,
        })
    }

    /// Path of a previously kept file. Names never contain separators.
    pub fn path_of(&self, stored_name: &str) -> Result<PathBuf> {
        if stored_name.contains(['/', '\\']) || stored_name.starts_with('.') {
            return Err(AppError::Internal {
                message: format!("invalid stored file name: {}", stored_name),
            });
        }
        Ok(self.dir.join(stored_name))
    }

    /// Remove a kept file; a missing file is not an error
    pub async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.path_of(stored_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Attachment file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A written upload, deleted on drop unless kept
#[derive(Debug)]
pub struct StoredFile {
    path: PathBuf,
    stored_name: String,
    size: usize,
    keep: bool,
}

impl StoredFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Disarm the cleanup; the file now belongs to a database row
    pub fn keep(mut self) -> String {
        self.keep = true;
        std::mem::take(&mut self.stored_name)
    }
}

impl Drop for StoredFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> UploadStore {
        UploadStore::new(&UploadConfig {
            dir: dir.to_path_buf(),
            max_upload_bytes: 16,
            import_extensions: vec!["csv".to_string(), ".TSV".to_string()],
        })
    }

    #[test]
    fn test_extension_checks() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        assert_eq!(store.check_import_extension("data.CSV").unwrap(), "csv");
        assert_eq!(store.check_import_extension("data.tsv").unwrap(), "tsv");
        assert!(matches!(
            store.check_import_extension("data.xlsx"),
            Err(AppError::UnsupportedFileType { .. })
        ));
        assert!(store.check_import_extension("noext").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\spec.pdf"), "spec.pdf");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[tokio::test]
    async fn test_dropped_file_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let file = store.store("a.csv", b"x,y\n").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_kept_file_survives() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let file = store.store("a.pdf", b"%PDF").await.unwrap();
        let name = file.keep();
        let path = store.path_of(&name).unwrap();
        assert!(path.exists());

        store.remove(&name).await.unwrap();
        assert!(!path.exists());
        store.remove(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_before_write() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let err = store.store("big.csv", &[0u8; 32]).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { size: 32, limit: 16 }));
    }

    #[test]
    fn test_path_of_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store(tmp.path()).path_of("../x").is_err());
    }
}
