//! PDF rasterisation behind the [`PageRenderer`] seam.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a synchronous C++ library. Rendering a long document can take
//! seconds of CPU, so [`render_pages`] moves the call onto Tokio's blocking
//! pool. The request's task is suspended meanwhile and the HTTP workers keep
//! serving other requests.
//!
//! ## Timeout
//!
//! The blocking call cannot be interrupted. When `render_timeout` expires the
//! request gives up and cleans up, while the pdfium call runs to completion
//! in the background and its result is dropped.

use crate::config::{RenderOptions, ServiceConfig};
use crate::error::ConvertError;
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One encoded page image, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Converts a PDF on disk into an ordered sequence of page images.
///
/// Implementations are called from a blocking thread and may take as long
/// as they need.
pub trait PageRenderer: Send + Sync {
    fn render(
        &self,
        pdf_path: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<RenderedPage>, ConvertError>;
}

/// Run `renderer` on the blocking pool, bounded by `timeout`.
///
/// A panic inside the renderer is reported as [`ConvertError::RenderFailure`].
pub async fn render_pages(
    renderer: Arc<dyn PageRenderer>,
    pdf_path: &Path,
    options: &RenderOptions,
    timeout: Duration,
) -> Result<Vec<RenderedPage>, ConvertError> {
    let path = pdf_path.to_path_buf();
    let opts = options.clone();
    let task = tokio::task::spawn_blocking(move || renderer.render(&path, &opts));

    let pages = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            return Err(ConvertError::RenderTimeout {
                path: pdf_path.to_path_buf(),
                secs: timeout.as_secs(),
            })
        }
        Ok(joined) => joined.map_err(|e| ConvertError::RenderFailure {
            path: pdf_path.to_path_buf(),
            detail: format!("Render task panicked: {e}"),
        })??,
    };

    if pages.is_empty() {
        return Err(ConvertError::RenderFailure {
            path: pdf_path.to_path_buf(),
            detail: "document has no pages".into(),
        });
    }
    Ok(pages)
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Where the pdfium shared library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumSource {
    Library(PathBuf),
    System,
}

impl PdfiumSource {
    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        match self {
            PdfiumSource::Library(path) => Pdfium::bind_to_library(path).map(Pdfium::new),
            PdfiumSource::System => Pdfium::bind_to_system_library().map(Pdfium::new),
        }
    }
}

/// [`PageRenderer`] backed by pdfium.
///
/// The library location is resolved once at construction; each render
/// binds its own `Pdfium` handle on the blocking thread that uses it.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    source: PdfiumSource,
}

impl PdfiumRenderer {
    /// Locate pdfium, failing fast if no library can be bound.
    pub fn new(config: &ServiceConfig) -> Result<Self, ConvertError> {
        Ok(Self {
            source: locate_pdfium(config.pdfium_lib_path.as_deref())?,
        })
    }

    pub fn source(&self) -> &PdfiumSource {
        &self.source
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(
        &self,
        pdf_path: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<RenderedPage>, ConvertError> {
        let fail = |detail: String| ConvertError::RenderFailure {
            path: pdf_path.to_path_buf(),
            detail,
        };

        let pdfium = self
            .source
            .bind()
            .map_err(|e| ConvertError::PdfiumBindingFailed(e.to_string()))?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| fail(format!("{e:?}")))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(options.scale)
            .set_maximum_width(options.width as i32)
            .set_maximum_height(options.height as i32);

        let mut results = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| fail(format!("page {}: {e:?}", idx + 1)))?;

            let image = bitmap.as_image();
            let data = encode::encode_page(&image, options.format)
                .map_err(|e| fail(format!("page {}: image encoding failed: {e}", idx + 1)))?;

            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            results.push(RenderedPage {
                data,
                width: image.width(),
                height: image.height(),
            });
        }

        Ok(results)
    }
}

/// Find a bindable pdfium library.
///
/// Tried in order: `explicit`, `PDFIUM_LIB_PATH`, the platform library
/// name in the working directory, the system library path.
pub fn locate_pdfium(explicit: Option<&Path>) -> Result<PdfiumSource, ConvertError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = explicit {
        candidates.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            candidates.push(PathBuf::from(p));
        }
    }
    candidates.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./")));

    let mut errors = Vec::new();
    for path in candidates {
        let path = if path.is_dir() {
            PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&path))
        } else {
            path
        };
        let source = PdfiumSource::Library(path.clone());
        match source.bind() {
            Ok(_) => {
                info!("Using pdfium library {}", path.display());
                return Ok(source);
            }
            Err(e) => errors.push(format!("{}: {e}", path.display())),
        }
    }

    match PdfiumSource::System.bind() {
        Ok(_) => {
            info!("Using system pdfium library");
            Ok(PdfiumSource::System)
        }
        Err(e) => {
            errors.push(format!("system library: {e}"));
            Err(ConvertError::PdfiumBindingFailed(errors.join("; ")))
        }
    }
}
