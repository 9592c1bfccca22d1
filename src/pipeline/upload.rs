//! Upload reception: stream the PDF field of a multipart body to disk.
//!
//! Nothing touches the filesystem until the expected field actually shows
//! up, so a request without a file leaves no trace. Once the workspace
//! exists, every error path discards it before returning.
//!
//! The `%PDF` signature is checked on the first bytes that arrive, which
//! turns an obviously wrong upload into a 400 before the renderer ever
//! sees it.

use crate::config::ServiceConfig;
use crate::error::ConvertError;
use crate::pipeline::workspace::Workspace;
use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF that has been written to its workspace.
#[derive(Debug)]
pub struct ReceivedUpload {
    pub workspace: Workspace,
    /// Bytes written to the upload file.
    pub size: u64,
    /// Client-supplied filename, for logging only.
    pub file_name: Option<String>,
}

/// Read `payload` until the configured file field is found and persist it.
///
/// The file field is the first part named `config.field_name` that carries
/// a filename. Other fields, including text fields with the same name, are
/// drained and ignored. A missing or empty file yields
/// [`ConvertError::MissingInput`].
pub async fn receive_upload(
    mut payload: Multipart,
    config: &ServiceConfig,
) -> Result<ReceivedUpload, ConvertError> {
    let mut consumed: u64 = 0;
    let mut received: Option<ReceivedUpload> = None;

    loop {
        let next = match payload.try_next().await {
            Ok(next) => next,
            Err(e) => {
                if let Some(r) = received.take() {
                    r.workspace.discard().await;
                }
                return Err(ConvertError::MalformedUpload(e.to_string()));
            }
        };
        let Some(mut field) = next else { break };

        // Only file parts count; a plain text field with the same name is drained.
        let has_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        let is_file_field = received.is_none()
            && has_filename
            && field.name() == Some(config.field_name.as_str());
        let outcome = if is_file_field {
            persist_field(&mut field, config, &mut consumed)
                .await
                .map(|r| received = r)
        } else {
            drain_field(&mut field, config, &mut consumed).await
        };

        if let Err(e) = outcome {
            if let Some(r) = received.take() {
                r.workspace.discard().await;
            }
            return Err(e);
        }
    }

    let upload = received.ok_or_else(|| ConvertError::MissingInput {
        field: config.field_name.clone(),
    })?;

    info!(
        request_id = %upload.workspace.id(),
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        "Received upload: {} bytes",
        upload.size
    );
    Ok(upload)
}

/// Write one field into a fresh workspace.
///
/// Returns `Ok(None)` for an empty field; the workspace is discarded.
async fn persist_field(
    field: &mut Field,
    config: &ServiceConfig,
    consumed: &mut u64,
) -> Result<Option<ReceivedUpload>, ConvertError> {
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string);

    let (workspace, mut file) = Workspace::create(config).await?;
    let mut head: Vec<u8> = Vec::with_capacity(PDF_MAGIC.len());
    let mut size: u64 = 0;

    let result = async {
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ConvertError::MalformedUpload(e.to_string()))?
        {
            *consumed += chunk.len() as u64;
            if *consumed > config.max_upload_bytes {
                return Err(ConvertError::PayloadTooLarge {
                    limit: config.max_upload_bytes,
                });
            }

            if head.len() < PDF_MAGIC.len() {
                let take = (PDF_MAGIC.len() - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
                if head.len() == PDF_MAGIC.len() {
                    check_magic(&head)?;
                }
            }

            file.write_all(&chunk)
                .await
                .map_err(|e| ConvertError::Workspace {
                    path: workspace.upload_path().to_path_buf(),
                    source: e,
                })?;
            size += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| ConvertError::Workspace {
            path: workspace.upload_path().to_path_buf(),
            source: e,
        })?;
        Ok::<(), ConvertError>(())
    }
    .await;
    drop(file);

    if let Err(e) = result {
        workspace.discard().await;
        return Err(e);
    }

    if size == 0 {
        debug!("Ignoring empty '{}' field", config.field_name);
        workspace.discard().await;
        return Ok(None);
    }

    if head.len() < PDF_MAGIC.len() {
        let magic = head.clone();
        workspace.discard().await;
        return Err(ConvertError::NotAPdf { magic });
    }

    Ok(Some(ReceivedUpload {
        workspace,
        size,
        file_name,
    }))
}

/// Read and discard a field, still counting it against the upload limit.
async fn drain_field(
    field: &mut Field,
    config: &ServiceConfig,
    consumed: &mut u64,
) -> Result<(), ConvertError> {
    debug!("Skipping multipart field {:?}", field.name());
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| ConvertError::MalformedUpload(e.to_string()))?
    {
        *consumed += chunk.len() as u64;
        if *consumed > config.max_upload_bytes {
            return Err(ConvertError::PayloadTooLarge {
                limit: config.max_upload_bytes,
            });
        }
    }
    Ok(())
}

/// Verify the PDF signature.
pub fn check_magic(head: &[u8]) -> Result<(), ConvertError> {
    if head.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(ConvertError::NotAPdf {
            magic: head.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}
