use std::io;
use std::path::PathBuf;

use uuid::Uuid;

/// Receipt images live on the local filesystem under a configurable root,
/// keyed by a server-generated file name. The payments table stores only
/// that name.
#[derive(Clone)]
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the storage root if it does not exist yet.
    pub async fn init(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Writes the image bytes under a fresh name and returns it.
    pub async fn save(&self, bytes: &[u8]) -> io::Result<String> {
        let name = format!("{}.bin", Uuid::new_v4().simple());
        tokio::fs::write(self.root.join(&name), bytes).await?;
        Ok(name)
    }

    /// Removes a stored receipt. Names are single path components; anything
    /// that could escape the root is refused. A missing file counts as
    /// deleted.
    pub async fn delete(&self, name: &str) -> io::Result<()> {
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid receipt name",
            ));
        }
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
