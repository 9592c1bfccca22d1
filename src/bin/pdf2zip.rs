//! CLI binary for pdf2zip.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, then either serves HTTP or converts one file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf2zip::{
    build_server, convert_to_file, ApiState, PageFormat, PdfiumRenderer, ServiceConfig,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (http://127.0.0.1:3000)
  pdf2zip serve

  # Listen on all interfaces, PNG pages
  pdf2zip serve --host 0.0.0.0 --port 8080 --format png

  # Convert a single file without HTTP
  pdf2zip convert report.pdf -o report.zip

  # Upload with curl
  curl -F pdf=@report.pdf -OJ http://127.0.0.1:3000/convert

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium (file or directory)
  RUST_LOG          Overrides the -v / -q log filter
"#;

/// Convert PDF pages into a zip of images, over HTTP or from the shell.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2zip",
    version,
    about = "Convert PDF pages into a zip archive of images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2ZIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2ZIP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP upload service.
    Serve {
        /// Address to bind.
        #[arg(long, env = "PDF2ZIP_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind.
        #[arg(short, long, env = "PDF2ZIP_PORT", default_value_t = 3000)]
        port: u16,

        /// Directory for incoming PDFs.
        #[arg(long, env = "PDF2ZIP_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,

        /// Directory for per-request page folders and archives.
        #[arg(long, env = "PDF2ZIP_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Static assets served at `/`.
        #[arg(long, env = "PDF2ZIP_PUBLIC_DIR", default_value = "public")]
        public_dir: PathBuf,

        /// Multipart field carrying the PDF.
        #[arg(long, env = "PDF2ZIP_FIELD_NAME", default_value = "pdf")]
        field_name: String,

        /// Largest accepted upload, in bytes.
        #[arg(long, env = "PDF2ZIP_MAX_UPLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
        max_upload_bytes: u64,

        /// Delay before the page directory is removed after a download (ms).
        #[arg(long, env = "PDF2ZIP_CLEANUP_GRACE_MS", default_value_t = 1000)]
        cleanup_grace_ms: u64,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Convert one PDF on disk into a zip archive.
    Convert {
        /// PDF file to convert.
        input: PathBuf,

        /// Where to write the archive.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Flags shared by both subcommands.
#[derive(Args, Debug)]
struct RenderArgs {
    /// Maximum page width in pixels.
    #[arg(long, env = "PDF2ZIP_WIDTH", default_value_t = 1200)]
    width: u32,

    /// Maximum page height in pixels.
    #[arg(long, env = "PDF2ZIP_HEIGHT", default_value_t = 1600)]
    height: u32,

    /// Scale factor applied to each page's natural size.
    #[arg(long, env = "PDF2ZIP_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Page image format.
    #[arg(long, env = "PDF2ZIP_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// JPEG quality (1–100). Ignored for PNG.
    #[arg(long, env = "PDF2ZIP_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Deflate level for the archive (0–9).
    #[arg(long, env = "PDF2ZIP_COMPRESSION", default_value_t = 9,
          value_parser = clap::value_parser!(i64).range(0..=9))]
    compression: i64,

    /// Seconds allowed for rendering one document.
    #[arg(long, env = "PDF2ZIP_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,

    /// Path to libpdfium, overriding PDFIUM_LIB_PATH.
    #[arg(long, env = "PDF2ZIP_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl RenderArgs {
    fn page_format(&self) -> PageFormat {
        match self.format {
            FormatArg::Jpeg => PageFormat::Jpeg {
                quality: self.quality,
            },
            FormatArg::Png => PageFormat::Png,
        }
    }

    fn apply(&self, builder: pdf2zip::ServiceConfigBuilder) -> pdf2zip::ServiceConfigBuilder {
        let builder = builder
            .render(pdf2zip::RenderOptions {
                width: self.width,
                height: self.height,
                scale: self.scale,
                format: self.page_format(),
            })
            .compression_level(self.compression)
            .render_timeout_secs(self.render_timeout);
        match self.pdfium_lib {
            Some(ref path) => builder.pdfium_lib_path(path.clone()),
            None => builder,
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            host,
            port,
            upload_dir,
            output_dir,
            public_dir,
            field_name,
            max_upload_bytes,
            cleanup_grace_ms,
            render,
        } => {
            let config = render
                .apply(ServiceConfig::builder())
                .host(host)
                .port(port)
                .upload_dir(upload_dir)
                .output_dir(output_dir)
                .public_dir(public_dir)
                .field_name(field_name)
                .max_upload_bytes(max_upload_bytes)
                .cleanup_grace_ms(cleanup_grace_ms)
                .build()
                .context("Invalid configuration")?;

            let renderer =
                PdfiumRenderer::new(&config).context("Failed to locate the PDFium library")?;
            tracing::debug!("Using PDFium from {:?}", renderer.source());

            build_server(ApiState::new(config, Arc::new(renderer)))
                .await
                .context("Failed to start server")?
                .await
                .context("Server stopped with an error")?;
        }
        Command::Convert {
            input,
            output,
            render,
        } => {
            let config = render
                .apply(ServiceConfig::builder())
                .build()
                .context("Invalid configuration")?;
            let renderer =
                PdfiumRenderer::new(&config).context("Failed to locate the PDFium library")?;

            let stats = convert_to_file(&input, &output, Arc::new(renderer), &config)
                .await
                .with_context(|| format!("Failed to convert {}", input.display()))?;

            if !cli.quiet {
                eprintln!(
                    "{} pages  {} bytes  {}ms  →  {}",
                    stats.page_count,
                    stats.archive_bytes,
                    stats.render_duration_ms + stats.archive_duration_ms,
                    output.display()
                );
            }
        }
    }

    Ok(())
}
