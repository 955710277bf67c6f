//! Durable copies of the cart lines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::line::CartLine;

/// Where the cart lines survive between sessions.
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Returns the stored lines, or an empty list if nothing was saved yet.
    async fn load(&self) -> Result<Vec<CartLine>>;

    /// Replaces the stored lines.
    async fn save(&self, lines: &[CartLine]) -> Result<()>;
}

/// Stores the cart as a JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated cart behind.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CartStorage for FileCartStorage {
    async fn load(&self) -> Result<Vec<CartLine>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, lines: &[CartLine]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(lines)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), lines = lines.len(), "cart saved");
        Ok(())
    }
}

/// Keeps the cart lines in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    lines: Arc<RwLock<Vec<CartLine>>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Vec<CartLine>> {
        Ok(self.lines.read().await.clone())
    }

    async fn save(&self, lines: &[CartLine]) -> Result<()> {
        *self.lines.write().await = lines.to_vec();
        Ok(())
    }
}
