//! Per-request working directories.
//!
//! Every request owns one directory under the download root, named by a fresh
//! token. Concurrent requests never share a directory, and dropping the arena
//! does not touch the disk: callers remove it explicitly once the artifact has
//! been delivered (chat) or the retention window has passed (web).

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A directory scoped to one request's lifetime.
#[derive(Debug, Clone)]
pub struct TaskArena {
    dir: PathBuf,
}

impl TaskArena {
    /// Creates `<root>/<token>` with a new random token.
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        Self::create_with_token(root, Uuid::new_v4().simple().to_string()).await
    }

    /// Creates `<root>/<token>` for a caller-chosen token (the web task id).
    pub async fn create_with_token(root: &Path, token: impl Into<String>) -> std::io::Result<Self> {
        let dir = root.join(token.into());
        tokio::fs::create_dir_all(&dir).await?;
        log::debug!("Created arena {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Removes the directory and everything in it. Missing directories are fine.
    pub async fn remove(&self) {
        remove_dir_quietly(&self.dir).await;
    }
}

/// Deletes a directory tree, logging instead of failing.
pub async fn remove_dir_quietly(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => log::debug!("Removed arena {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_arenas_are_distinct() {
        let root = TempDir::new().unwrap();
        let a = TaskArena::create(root.path()).await.unwrap();
        let b = TaskArena::create(root.path()).await.unwrap();
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().is_dir());
        assert!(b.dir().is_dir());
    }

    #[tokio::test]
    async fn test_remove_deletes_contents_and_is_idempotent() {
        let root = TempDir::new().unwrap();
        let arena = TaskArena::create_with_token(root.path(), "abcd1234").await.unwrap();
        assert_eq!(arena.dir(), root.path().join("abcd1234"));
        std::fs::write(arena.dir().join("clip.mp4"), b"data").unwrap();

        arena.remove().await;
        assert!(!arena.dir().exists());
        arena.remove().await;
    }
}
