use actix_multipart::Multipart;
use actix_web::body::SizedStream;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::convert::convert_upload;
use crate::error::ConvertError;
use crate::lifecycle::{PhaseTracker, RequestPhase};
use crate::output::ConvertedArchive;
use crate::pipeline::upload::{self, ReceivedUpload};
use crate::pipeline::workspace::Workspace;
use super::state::ApiState;

/// `POST /convert`: multipart PDF in, zip of page images out.
pub async fn convert(
    payload: Multipart,
    state: web::Data<ApiState>,
) -> Result<HttpResponse, ConvertError> {
    let config = &state.config;

    let ReceivedUpload {
        mut workspace,
        size,
        ..
    } = upload::receive_upload(payload, config)
        .await
        .inspect_err(log_error)?;

    let mut tracker = PhaseTracker::new(workspace.id());

    let archive = match convert_upload(
        &mut workspace,
        size,
        state.renderer.clone(),
        config,
        &mut tracker,
    )
    .await
    {
        Ok(archive) => archive,
        Err(e) => return Err(abort(workspace, tracker, e).await),
    };

    if let Err(e) = tracker.advance(RequestPhase::Streaming) {
        return Err(abort(workspace, tracker, e).await);
    }

    let file = match tokio::fs::File::open(&archive.path).await {
        Ok(file) => file,
        Err(source) => {
            let e = ConvertError::DeliveryFailure {
                path: archive.path.clone(),
                source,
            };
            return Err(abort(workspace, tracker, e).await);
        }
    };

    workspace.defer_with_grace(config.cleanup_grace());
    Ok(stream_archive(file, archive, workspace, tracker))
}

/// Build the download response. The workspace rides along in the body, so
/// its cleanup runs when the body is dropped: after the last byte is sent,
/// or as soon as the client goes away.
fn stream_archive(
    file: tokio::fs::File,
    archive: ConvertedArchive,
    workspace: Workspace,
    tracker: PhaseTracker,
) -> HttpResponse {
    let mut guard = DeliveryGuard {
        request_id: archive.id,
        workspace,
        tracker,
    };
    let path = archive.path.clone();
    let body = ReaderStream::new(file).map(move |chunk| {
        if let Err(ref source) = chunk {
            tracing::error!(
                request_id = %guard.request_id,
                "Failed to stream {}: {}",
                path.display(),
                source
            );
            guard.tracker.fail();
        }
        chunk
    });

    HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(archive.download_name())],
        })
        .body(SizedStream::new(archive.stats.archive_bytes, body))
}

/// Owns a delivered request's workspace until the response body is dropped.
struct DeliveryGuard {
    request_id: uuid::Uuid,
    workspace: Workspace,
    tracker: PhaseTracker,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        let _ = self.tracker.advance(RequestPhase::CleanedUp);
        tracing::debug!(
            request_id = %self.request_id,
            "Archive handle released; cleanup of {} scheduled",
            self.workspace.output_dir().display()
        );
    }
}

/// Failure branch: log once, remove everything, report.
async fn abort(
    workspace: Workspace,
    mut tracker: PhaseTracker,
    error: ConvertError,
) -> ConvertError {
    let request_id = workspace.id();
    tracing::error!(%request_id, phase = %tracker.phase(), "{}", error);
    tracker.fail();
    workspace.discard().await;
    let _ = tracker.advance(RequestPhase::CleanedUp);
    error
}

fn log_error(error: &ConvertError) {
    if error.is_client_error() {
        tracing::warn!("Rejected upload: {}", error);
    } else {
        tracing::error!("Upload failed: {}", error);
    }
}
