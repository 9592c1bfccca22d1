//! Error types for the pdf2zip service.
//!
//! Every failure a request can hit is a [`ConvertError`]. The variants split
//! along the request lifecycle:
//!
//! * **Upload**: nothing usable arrived (`MissingInput`, `NotAPdf`,
//!   `MalformedUpload`, `PayloadTooLarge`). These are client errors.
//! * **Conversion**: the renderer or the archive builder gave up
//!   (`RenderFailure`, `RenderTimeout`, `ArchiveFailure`).
//! * **Delivery**: the finished archive could not be sent
//!   (`DeliveryFailure`).
//!
//! The `Display` text is meant for server logs. Clients only ever see the
//! short, fixed message returned by [`ConvertError::client_message`].

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2zip library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The request carried no file in the expected multipart field.
    #[error("No file uploaded: expected a multipart field named '{field}'")]
    MissingInput { field: String },

    /// The uploaded bytes do not start with the `%PDF` signature.
    #[error("Uploaded file is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The multipart body could not be parsed.
    #[error("Malformed multipart upload: {0}")]
    MalformedUpload(String),

    /// The upload exceeded `max_upload_bytes`.
    #[error("Upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The page renderer rejected or could not process the document.
    #[error("Rendering failed for '{path}': {detail}")]
    RenderFailure { path: PathBuf, detail: String },

    /// The page renderer did not finish within `render_timeout_secs`.
    #[error("Rendering '{path}' timed out after {secs}s")]
    RenderTimeout { path: PathBuf, secs: u64 },

    /// Writing page files or compressing the output directory failed.
    #[error("Failed to build archive '{path}': {detail}")]
    ArchiveFailure { path: PathBuf, detail: String },

    // ── Delivery errors ───────────────────────────────────────────────────
    /// The archive could not be opened or streamed to the client.
    #[error("Failed to deliver archive '{path}': {source}")]
    DeliveryFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Environment errors ────────────────────────────────────────────────
    /// A per-request file or directory could not be created.
    #[error("Failed to prepare '{path}': {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Point PDFIUM_LIB_PATH (or --pdfium-lib) at an existing libpdfium, or place\n\
the library in the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Fixed, detail-free message sent to HTTP clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            ConvertError::MissingInput { .. } => "No file uploaded.",
            ConvertError::NotAPdf { .. } => "The uploaded file is not a PDF.",
            ConvertError::MalformedUpload(_) => "The upload could not be read.",
            ConvertError::PayloadTooLarge { .. } => "The uploaded file is too large.",
            ConvertError::RenderFailure { .. } | ConvertError::RenderTimeout { .. } => {
                "An error occurred while converting the PDF."
            }
            ConvertError::ArchiveFailure { .. } => "An error occurred while building the archive.",
            ConvertError::DeliveryFailure { .. } => "An error occurred while downloading the file.",
            ConvertError::Workspace { .. }
            | ConvertError::PdfiumBindingFailed(_)
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => "An internal error occurred.",
        }
    }

    /// `true` for errors the client can fix by sending a different request.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for ConvertError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::MissingInput { .. }
            | ConvertError::NotAPdf { .. }
            | ConvertError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.client_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn missing_input_is_bad_request() {
        let e = ConvertError::MissingInput {
            field: "pdf".into(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert!(e.is_client_error());
        assert!(e.to_string().contains("'pdf'"), "got: {e}");
    }

    #[test]
    fn render_failure_is_server_error() {
        let e = ConvertError::RenderFailure {
            path: PathBuf::from("uploads/abc"),
            detail: "bad xref".into(),
        };
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.is_client_error());
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn payload_too_large_maps_to_413() {
        let e = ConvertError::PayloadTooLarge { limit: 10 };
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn response_body_hides_internal_detail() {
        let e = ConvertError::ArchiveFailure {
            path: PathBuf::from("/srv/output/secret/secret.zip"),
            detail: "disk quota exceeded".into(),
        };
        let resp = e.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().try_into_bytes().unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(!text.contains("secret"));
        assert!(!text.contains("quota"));
        assert_eq!(text, "An error occurred while building the archive.");
    }

    #[test]
    fn delivery_failure_keeps_io_source() {
        use std::error::Error as _;
        let e = ConvertError::DeliveryFailure {
            path: PathBuf::from("a.zip"),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone"),
        };
        assert!(e.source().is_some());
        assert_eq!(e.client_message(), "An error occurred while downloading the file.");
    }
}
