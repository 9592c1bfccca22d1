//! The per-request filesystem namespace.
//!
//! A [`Workspace`] owns the three paths a request may create:
//!
//! ```text
//! {upload_dir}/{id}              UploadedFile
//! {output_dir}/{id}/             OutputDirectory
//! {output_dir}/{id}/{id}.zip     ArchiveFile
//! ```
//!
//! `id` is a fresh v4 UUID, so concurrent requests never share a path. The
//! upload file is opened with `create_new`, which turns the (astronomically
//! unlikely) collision into an error instead of a silent overwrite.
//!
//! Dropping a workspace that was not cleaned up explicitly schedules its
//! [`CleanupPlan`] on the runtime. That covers cancelled request futures
//! and response bodies dropped by a disconnecting client.

use crate::config::ServiceConfig;
use crate::error::ConvertError;
use crate::pipeline::cleanup::CleanupPlan;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    upload: PathBuf,
    output_dir: PathBuf,
    archive: PathBuf,
    archive_created: bool,
    grace_on_drop: Duration,
    cleaned: bool,
}

impl Workspace {
    /// Reserve a fresh token and create the (empty) upload file.
    pub async fn create(config: &ServiceConfig) -> Result<(Self, tokio::fs::File), ConvertError> {
        let id = Uuid::new_v4();
        let upload = config.upload_dir.join(id.to_string());
        let output_dir = config.output_dir.join(id.to_string());
        let archive = output_dir.join(format!("{id}.zip"));

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&upload)
            .await
            .map_err(|e| ConvertError::Workspace {
                path: upload.clone(),
                source: e,
            })?;

        debug!(request_id = %id, "Created upload file {}", upload.display());

        Ok((
            Self {
                id,
                upload,
                output_dir,
                archive,
                archive_created: false,
                grace_on_drop: Duration::ZERO,
                cleaned: false,
            },
            file,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn upload_path(&self) -> &Path {
        &self.upload
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Create the output directory. Fails if it already exists.
    pub async fn create_output_dir(&self) -> Result<(), ConvertError> {
        tokio::fs::create_dir(&self.output_dir)
            .await
            .map_err(|e| ConvertError::Workspace {
                path: self.output_dir.clone(),
                source: e,
            })
    }

    /// Record that the archive file now exists on disk.
    pub fn mark_archive_created(&mut self) {
        self.archive_created = true;
    }

    /// Arrange for the output directory to be removed `grace` after the
    /// workspace is dropped, instead of immediately. Used on the success
    /// path once the workspace is handed to the response body.
    pub fn defer_with_grace(&mut self, grace: Duration) {
        self.grace_on_drop = grace;
    }

    fn plan(&self, grace: Duration) -> CleanupPlan {
        CleanupPlan {
            upload: self.upload.clone(),
            archive: self.archive_created.then(|| self.archive.clone()),
            output_dir: self.output_dir.clone(),
            grace,
        }
    }

    /// Remove every artifact now. Used on failure branches.
    pub async fn discard(mut self) {
        self.cleaned = true;
        self.plan(Duration::ZERO).run().await;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.cleaned {
            self.cleaned = true;
            self.plan(self.grace_on_drop).spawn();
        }
    }
}
