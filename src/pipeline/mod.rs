//! Pipeline stages for PDF-to-archive conversion.
//!
//! Each submodule implements exactly one step of a request.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ archive ──▶ (response) ──▶ cleanup
//! (multipart) (pdfium)   (zip)                    (workspace drop)
//! ```
//!
//! 1. [`upload`]: stream the multipart file field into the request's
//!    [`workspace`]
//! 2. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: JPEG/PNG-encode each page bitmap
//! 4. [`archive`]: write `page_<n>.<ext>` files and zip the directory
//! 5. [`cleanup`]: idempotent removal of everything the request created

pub mod archive;
pub mod cleanup;
pub mod encode;
pub mod render;
pub mod upload;
pub mod workspace;
