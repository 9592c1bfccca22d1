//! Configuration types for the conversion service.
//!
//! Everything a running service needs is carried by one [`ServiceConfig`]
//! value, built via [`ServiceConfigBuilder`] and injected into the HTTP app.
//! There are no process-wide singletons, so tests can run several services
//! with different directories side by side.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a conversion service instance.
///
/// # Example
/// ```rust
/// use pdf2zip::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(8080)
///     .upload_dir("/tmp/pdf2zip/uploads")
///     .output_dir("/tmp/pdf2zip/output")
///     .cleanup_grace_ms(250)
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address. Default: `127.0.0.1`.
    pub host: String,

    /// Listen port. Default: 3000.
    pub port: u16,

    /// Directory holding one temporary file per in-flight upload. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Root holding one output directory per in-flight request. Default: `output`.
    pub output_dir: PathBuf,

    /// Static assets served for every path other than `/convert`. Default: `public`.
    ///
    /// Ignored when the directory does not exist.
    pub public_dir: PathBuf,

    /// Name of the multipart field carrying the PDF. Default: `pdf`.
    pub field_name: String,

    /// Page rasterisation settings.
    pub render: RenderOptions,

    /// Deflate level used for the archive (0–9). Default: 9.
    pub compression_level: i64,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// Upper bound on the time a single document may spend in the renderer.
    /// Default: 120.
    pub render_timeout_secs: u64,

    /// Pause between releasing the archive handle and deleting the output
    /// directory after a successful download. Default: 1000.
    ///
    /// The handle is already closed when the delay starts; the pause only
    /// narrows the window on platforms that release file locks lazily. It is
    /// a tunable, 0 disables it.
    pub cleanup_grace_ms: u64,

    /// Explicit path to the pdfium shared library.
    ///
    /// If None, `PDFIUM_LIB_PATH`, the working directory and the system
    /// library path are tried in that order.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            public_dir: PathBuf::from("public"),
            field_name: "pdf".to_string(),
            render: RenderOptions::default(),
            compression_level: 9,
            max_upload_bytes: 50 * 1024 * 1024,
            render_timeout_secs: 120,
            cleanup_grace_ms: 1000,
            pdfium_lib_path: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }

    /// `host:port` string for logging.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.public_dir = dir.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    pub fn render(mut self, options: RenderOptions) -> Self {
        self.config.render = options;
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.config.render.format = format;
        self
    }

    pub fn compression_level(mut self, level: i64) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn cleanup_grace_ms(mut self, ms: u64) -> Self {
        self.config.cleanup_grace_ms = ms;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConvertError> {
        let c = &self.config;
        if c.field_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Multipart field name must not be empty".into(),
            ));
        }
        if !(0..=9).contains(&c.compression_level) {
            return Err(ConvertError::InvalidConfig(format!(
                "Compression level must be 0–9, got {}",
                c.compression_level
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.render_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.upload_dir == c.output_dir {
            return Err(ConvertError::InvalidConfig(
                "Upload and output directories must differ".into(),
            ));
        }
        c.render.validate()?;
        Ok(self.config)
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Rasterisation settings handed to the page renderer.
///
/// Each page is scaled by `scale` from its natural size (in PDF points) and
/// then shrunk, keeping its aspect ratio, to fit inside `width × height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Maximum output width in pixels. Default: 1200.
    pub width: u32,
    /// Maximum output height in pixels. Default: 1600.
    pub height: u32,
    /// Scale factor applied to the page's natural size. Default: 2.0.
    pub scale: f32,
    /// Encoding of the page files. Default: JPEG, quality 90.
    pub format: PageFormat,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1600,
            scale: 2.0,
            format: PageFormat::default(),
        }
    }
}

impl RenderOptions {
    fn validate(&self) -> Result<(), ConvertError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConvertError::InvalidConfig(format!(
                "Render size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "Render scale must be a positive number, got {}",
                self.scale
            )));
        }
        if let PageFormat::Jpeg { quality } = self.format {
            if !(1..=100).contains(&quality) {
                return Err(ConvertError::InvalidConfig(format!(
                    "JPEG quality must be 1–100, got {quality}"
                )));
            }
        }
        Ok(())
    }
}

/// Image encoding used for the page files inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    /// Lossy JPEG. Produces `page_<n>.jpg`.
    Jpeg { quality: u8 },
    /// Lossless PNG. Produces `page_<n>.png`.
    Png,
}

impl Default for PageFormat {
    fn default() -> Self {
        PageFormat::Jpeg { quality: 90 }
    }
}

impl PageFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PageFormat::Jpeg { .. } => "jpg",
            PageFormat::Png => "png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_render_settings() {
        let c = ServiceConfig::default();
        assert_eq!(c.port, 3000);
        assert_eq!(c.field_name, "pdf");
        assert_eq!(c.render.width, 1200);
        assert_eq!(c.render.height, 1600);
        assert_eq!(c.render.scale, 2.0);
        assert_eq!(c.compression_level, 9);
        assert_eq!(c.cleanup_grace(), Duration::from_secs(1));
        assert_eq!(c.render.format.extension(), "jpg");
    }

    #[test]
    fn builder_sets_fields() {
        let c = ServiceConfig::builder()
            .host("0.0.0.0")
            .port(8081)
            .field_name("document")
            .page_format(PageFormat::Png)
            .cleanup_grace_ms(0)
            .build()
            .unwrap();
        assert_eq!(c.bind_address(), "0.0.0.0:8081");
        assert_eq!(c.field_name, "document");
        assert_eq!(c.render.format.extension(), "png");
        assert_eq!(c.cleanup_grace(), Duration::ZERO);
    }

    #[test]
    fn builder_rejects_bad_compression_level() {
        let err = ServiceConfig::builder()
            .compression_level(10)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_shared_directories() {
        let err = ServiceConfig::builder()
            .upload_dir("tmp")
            .output_dir("tmp")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn builder_rejects_bad_render_options() {
        let bad_scale = RenderOptions {
            scale: 0.0,
            ..RenderOptions::default()
        };
        assert!(ServiceConfig::builder().render(bad_scale).build().is_err());

        let bad_quality = RenderOptions {
            format: PageFormat::Jpeg { quality: 0 },
            ..RenderOptions::default()
        };
        assert!(ServiceConfig::builder().render(bad_quality).build().is_err());
    }
}
