//! Removal of per-request artifacts.
//!
//! Every removal treats "already gone" as success, so a plan can run twice
//! (explicit cleanup followed by a guard drop, say) without logging noise.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Remove a file. Returns `Ok(false)` if it did not exist.
pub async fn remove_file(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recursively remove a directory. Returns `Ok(false)` if it did not exist.
pub async fn remove_dir(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// What to delete once a request is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub upload: PathBuf,
    /// Only set once the archive file was actually created.
    pub archive: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Wait before removing `output_dir`.
    pub grace: Duration,
}

impl CleanupPlan {
    /// Delete the upload and archive, wait `grace`, then delete the output
    /// directory. Errors are logged and otherwise ignored.
    pub async fn run(self) {
        log_outcome(&self.upload, remove_file(&self.upload).await);
        if let Some(ref archive) = self.archive {
            log_outcome(archive, remove_file(archive).await);
        }
        if !self.grace.is_zero() {
            tokio::time::sleep(self.grace).await;
        }
        log_outcome(&self.output_dir, remove_dir(&self.output_dir).await);
    }

    /// Run the plan in the background.
    ///
    /// Falls back to synchronous deletion (without the grace delay) when no
    /// Tokio runtime is available, e.g. while the runtime itself shuts down.
    pub fn spawn(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.run());
            }
            Err(_) => self.run_blocking(),
        }
    }

    fn run_blocking(self) {
        let file = |p: &Path| match std::fs::remove_file(p) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        };
        log_outcome(&self.upload, file(&self.upload));
        if let Some(ref archive) = self.archive {
            log_outcome(archive, file(archive));
        }
        let dir = match std::fs::remove_dir_all(&self.output_dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        };
        log_outcome(&self.output_dir, dir);
    }
}

fn log_outcome(path: &Path, outcome: io::Result<bool>) {
    match outcome {
        Ok(true) => debug!("Removed {}", path.display()),
        Ok(false) => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_file_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        tokio::fs::write(&path, b"%PDF-1.7").await.unwrap();

        assert!(remove_file(&path).await.unwrap());
        assert!(!remove_file(&path).await.unwrap());
    }

    #[tokio::test]
    async fn remove_dir_is_recursive_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        tokio::fs::create_dir_all(out.join("nested")).await.unwrap();
        tokio::fs::write(out.join("nested/page_1.jpg"), b"x").await.unwrap();

        assert!(remove_dir(&out).await.unwrap());
        assert!(!out.exists());
        assert!(!remove_dir(&out).await.unwrap());
    }

    #[tokio::test]
    async fn plan_removes_everything_twice_safely() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("upload");
        let output_dir = dir.path().join("out");
        let archive = output_dir.join("out.zip");
        tokio::fs::write(&upload, b"pdf").await.unwrap();
        tokio::fs::create_dir(&output_dir).await.unwrap();
        tokio::fs::write(&archive, b"zip").await.unwrap();

        let plan = CleanupPlan {
            upload: upload.clone(),
            archive: Some(archive.clone()),
            output_dir: output_dir.clone(),
            grace: Duration::from_millis(5),
        };
        plan.clone().run().await;
        plan.run().await;

        assert!(!upload.exists());
        assert!(!archive.exists());
        assert!(!output_dir.exists());
    }

    #[test]
    fn spawn_without_runtime_deletes_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("upload");
        let output_dir = dir.path().join("out");
        std::fs::write(&upload, b"pdf").unwrap();
        std::fs::create_dir(&output_dir).unwrap();

        CleanupPlan {
            upload: upload.clone(),
            archive: None,
            output_dir: output_dir.clone(),
            grace: Duration::from_secs(60),
        }
        .spawn();

        assert!(!upload.exists());
        assert!(!output_dir.exists());
    }
}
