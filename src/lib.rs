//! # pdf2zip
//!
//! A small HTTP service that turns an uploaded PDF into a zip archive of
//! per-page images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /convert (multipart, field "pdf")
//!  │
//!  ├─ 1. Upload   stream the field to uploads/<id>.pdf, check %PDF magic
//!  ├─ 2. Render   rasterise every page via pdfium (spawn_blocking + timeout)
//!  ├─ 3. Write    output/<id>/page_1.jpg … page_N.jpg
//!  ├─ 4. Archive  deflate the page files into output/<id>/<id>.zip
//!  ├─ 5. Stream   send the zip as an attachment named <id>.zip
//!  └─ 6. Cleanup  delete upload, archive and page directory
//! ```
//!
//! Every request works inside its own [`pipeline::workspace::Workspace`],
//! keyed by a fresh UUID. Cleanup is tied to that guard: on failure it runs
//! before the error response, on success once the response body has been
//! released.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pdf2zip::{build_server, ApiState, PdfiumRenderer, ServiceConfig};
//!
//! #[actix_web::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default();
//!     let renderer = Arc::new(PdfiumRenderer::new(&config)?);
//!     build_server(ApiState::new(config, renderer)).await?.await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2zip` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{build_server, configure_routes, ApiState};
pub use config::{PageFormat, RenderOptions, ServiceConfig, ServiceConfigBuilder};
pub use convert::{convert_to_file, convert_upload};
pub use error::ConvertError;
pub use lifecycle::{PhaseTracker, RequestPhase};
pub use output::{ConversionStats, ConvertedArchive};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderedPage};
