use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem layout for uploaded and annotated images.
///
/// Every request gets a fresh UUID filename, so concurrent requests never
/// contend on paths. Files are never deleted by this service.
#[derive(Debug, Clone)]
pub struct ImageStore {
    original_dir: PathBuf,
    annotated_dir: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            original_dir: root.join("original"),
            annotated_dir: root.join("annotated"),
        }
    }

    pub fn new_image_name() -> String {
        format!("{}.jpg", Uuid::new_v4())
    }

    pub fn original_path(&self, name: &str) -> PathBuf {
        self.original_dir.join(name)
    }

    pub fn annotated_path(&self, name: &str) -> PathBuf {
        self.annotated_dir.join(name)
    }

    /// Idempotent; both directories exist afterwards.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.original_dir).await?;
        tokio::fs::create_dir_all(&self.annotated_dir).await?;
        Ok(())
    }

    pub async fn save_original(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.original_path(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub async fn save_annotated(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.annotated_path(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
