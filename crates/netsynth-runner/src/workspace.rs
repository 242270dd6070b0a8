//! Per-job scratch directories.
//!
//! [`WorkspaceManager::acquire`] creates a uniquely named directory under a
//! configured root. The returned [`Workspace`] owns it exclusively;
//! [`Workspace::release`] removes it recursively, and dropping an unreleased
//! workspace does the same, so every exit path (including panics and
//! cancelled futures) cleans up exactly once. Removal failures are logged and
//! never propagated.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::error::WorkspaceError;

/// Creates workspaces under a fixed scratch root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        WorkspaceManager { root: root.into() }
    }

    /// Manager rooted at the system temporary directory.
    pub fn in_system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Creates a fresh workspace.
    ///
    /// Names combine a random job id with `tempfile`'s exclusive-create
    /// suffix, so concurrent calls never collide.
    pub fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let create_err = |source| WorkspaceError::Create {
            root: self.root.clone(),
            source,
        };

        std::fs::create_dir_all(&self.root).map_err(create_err)?;

        let id = Uuid::new_v4();
        let prefix = format!("netsynth-{}-", &id.simple().to_string()[..12]);
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)
            .map_err(create_err)?;

        tracing::debug!(workspace = %dir.path().display(), "workspace acquired");
        Ok(Workspace { id, dir: Some(dir) })
    }
}

/// An exclusively owned scratch directory.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        // `dir` is only taken by `release`/`drop`, both of which consume self.
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Absolute path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Writes `contents` to `name` inside the workspace.
    pub async fn stage(&self, name: &str, contents: &[u8]) -> Result<PathBuf, WorkspaceError> {
        let path = self.file(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| WorkspaceError::Stage {
                file: name.to_string(),
                source,
            })?;
        Ok(path)
    }

    /// Removes the workspace and everything in it.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => tracing::debug!(workspace = %path.display(), "workspace released"),
            Err(source) => {
                let err = WorkspaceError::Cleanup { path, source };
                tracing::warn!(error = %err, "workspace cleanup failed");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn entries(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[tokio::test]
    async fn release_removes_staged_files() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let workspace = manager.acquire().unwrap();
        let staged = workspace.stage("input.v", b"module m; endmodule").await.unwrap();
        std::fs::create_dir(workspace.file("nested")).unwrap();
        std::fs::write(workspace.file("nested/out.json"), b"{}").unwrap();
        assert!(staged.exists());
        assert_eq!(entries(root.path()), 1);

        workspace.release();
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn drop_cleans_up_unreleased_workspace() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        {
            let _workspace = manager.acquire().unwrap();
            assert_eq!(entries(root.path()), 1);
        }
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn concurrent_acquires_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.acquire().unwrap())
            })
            .collect();
        let workspaces: Vec<Workspace> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let paths: HashSet<PathBuf> = workspaces.iter().map(|w| w.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 16);
        drop(workspaces);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn creates_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path().join("scratch/jobs"));
        let workspace = manager.acquire().unwrap();
        assert!(workspace.path().starts_with(base.path().join("scratch/jobs")));
    }
}
