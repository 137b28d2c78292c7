//! Per-request workspaces
//!
//! Every request gets its own directory, `<root>/<request id>`, and every file
//! the backend produces is named after the same id. The directory is created
//! with `create_dir` (not `create_dir_all`), so allocation fails rather than
//! sharing a directory if the name were ever reused.
//!
//! [`Workspace`] is an owned guard. [`WorkspaceManager::release`] consumes it,
//! which makes double release impossible; if the guard is dropped without being
//! released (panic, cancelled future) its `Drop` removes the directory
//! synchronously.

use crate::config::WorkspaceConfig;
use crate::error::{Error, Result};
use crate::types::RequestId;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Allocates and removes per-request workspaces under one root
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root` (created lazily on first acquire)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a manager from configuration
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.root.clone())
    }

    /// Parent directory of all workspaces
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate the workspace for `id`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workspace`] if the root cannot be created or the
    /// workspace directory already exists.
    pub async fn acquire(&self, id: RequestId) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| Error::Workspace {
                path: self.root.clone(),
                source,
            })?;

        let path = self.root.join(id.to_string());
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| Error::Workspace {
                path: path.clone(),
                source,
            })?;

        debug!(request_id = %id, ?path, "workspace acquired");

        Ok(Workspace {
            id,
            path,
            released: false,
        })
    }

    /// Remove the workspace and everything in it
    ///
    /// A workspace that is already gone is not an error. Other removal
    /// failures are logged and swallowed; they never reach the requester.
    pub async fn release(&self, mut workspace: Workspace) {
        workspace.released = true;
        match tokio::fs::remove_dir_all(&workspace.path).await {
            Ok(()) => {
                debug!(request_id = %workspace.id, path = ?workspace.path, "workspace released");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    request_id = %workspace.id,
                    path = ?workspace.path,
                    "workspace already removed"
                );
            }
            Err(e) => {
                warn!(
                    request_id = %workspace.id,
                    path = ?workspace.path,
                    error = %e,
                    "failed to remove workspace"
                );
            }
        }
    }
}

/// An exclusively owned directory bound to one in-flight request
#[derive(Debug)]
pub struct Workspace {
    id: RequestId,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Request this workspace belongs to
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stem every produced file must start with
    pub fn file_stem(&self) -> String {
        self.id.to_string()
    }

    /// `<workspace>/<request id>.<ext>`
    pub fn file_path(&self, ext: &str) -> PathBuf {
        self.path.join(format!("{}.{}", self.id, ext))
    }

    /// Whether `candidate` lies inside this workspace
    ///
    /// Both paths are canonicalized when possible so `..` components and
    /// symlinks cannot escape.
    pub async fn contains(&self, candidate: &Path) -> bool {
        let root = tokio::fs::canonicalize(&self.path)
            .await
            .unwrap_or_else(|_| self.path.clone());
        match tokio::fs::canonicalize(candidate).await {
            Ok(resolved) => resolved.starts_with(&root) && resolved != root,
            Err(_) => false,
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                debug!(request_id = %self.id, path = ?self.path, "workspace removed on drop");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    request_id = %self.id,
                    path = ?self.path,
                    error = %e,
                    "failed to remove workspace on drop"
                );
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_creates_directory_named_after_request() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path().join("ws"));
        let id = RequestId::new();

        let workspace = manager.acquire(id).await.unwrap();

        assert_eq!(workspace.path(), temp.path().join("ws").join(id.to_string()));
        assert!(workspace.path().is_dir());
        assert_eq!(
            workspace.file_path("mp4"),
            workspace.path().join(format!("{id}.mp4"))
        );

        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn release_removes_nested_content() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.acquire(RequestId::new()).await.unwrap();
        let path = workspace.path().to_path_buf();

        std::fs::write(workspace.file_path("mp4"), b"video").unwrap();
        std::fs::create_dir(path.join("frag")).unwrap();
        std::fs::write(path.join("frag").join("part-1"), b"x").unwrap();

        manager.release(workspace).await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn release_tolerates_already_removed_workspace() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.acquire(RequestId::new()).await.unwrap();
        let path = workspace.path().to_path_buf();

        std::fs::remove_dir_all(&path).unwrap();
        manager.release(workspace).await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn dropping_unreleased_workspace_removes_it() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path());
        let workspace = manager.acquire(RequestId::new()).await.unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.file_path("mp3"), b"audio").unwrap();

        drop(workspace);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn acquiring_same_id_twice_fails() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path());
        let id = RequestId::new();
        let first = manager.acquire(id).await.unwrap();

        let second = manager.acquire(id).await;
        match second {
            Err(Error::Workspace { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists)
            }
            other => panic!("expected Workspace error, got {other:?}"),
        }

        manager.release(first).await;
    }

    #[tokio::test]
    async fn concurrent_acquires_get_distinct_paths() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let ws = manager.acquire(RequestId::new()).await.unwrap();
                let path = ws.path().to_path_buf();
                manager.release(ws).await;
                path
            }));
        }

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            assert!(paths.insert(handle.await.unwrap()), "duplicate workspace path");
        }
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn contains_rejects_paths_outside_workspace() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path().join("ws"));
        let workspace = manager.acquire(RequestId::new()).await.unwrap();

        let inside = workspace.file_path("mp4");
        std::fs::write(&inside, b"v").unwrap();
        let outside = temp.path().join("elsewhere.mp4");
        std::fs::write(&outside, b"v").unwrap();
        let escaping = workspace.path().join("..").join("..").join("elsewhere.mp4");

        assert!(workspace.contains(&inside).await);
        assert!(!workspace.contains(&outside).await);
        assert!(!workspace.contains(&escaping).await);
        assert!(!workspace.contains(workspace.path()).await);
        assert!(!workspace.contains(&workspace.file_path("missing")).await);

        manager.release(workspace).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn contains_resolves_symlinks_out_of_the_workspace() {
        let temp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(temp.path().join("ws"));
        let workspace = manager.acquire(RequestId::new()).await.unwrap();

        let outside = temp.path().join("elsewhere.mp4");
        std::fs::write(&outside, b"v").unwrap();
        let link = workspace.file_path("mp4");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        assert!(!workspace.contains(&link).await);

        manager.release(workspace).await;
        assert!(outside.exists(), "release must not follow symlinks out");
    }
}
