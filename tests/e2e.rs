//! End-to-end tests against a real PDFium library.
//!
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested, and need libpdfium to be
//! resolvable (`PDFIUM_LIB_PATH`, the working directory, or the system).
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture

use pdf2zip::{
    convert_to_file, ConvertError, PageFormat, PageRenderer, PdfiumRenderer, RenderOptions,
    ServiceConfig,
};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// A syntactically valid PDF with `pages` blank US-letter pages, each
/// carrying a short line of text.
fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 4 + i * 2)).collect();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".into());
    for i in 0..pages {
        let content_id = 5 + i * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        let text = format!("BT /F1 24 Tf 72 700 Td (Page {}) Tj ET", i + 1);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            text.len(),
            text
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", idx + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn write_sample(dir: &Path, pages: usize) -> std::path::PathBuf {
    let path = dir.join("sample.pdf");
    std::fs::write(&path, sample_pdf(pages)).unwrap();
    path
}

// ── Renderer ─────────────────────────────────────────────────────────────────

#[test]
fn test_render_sample_pages() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_sample(dir.path(), 3);

    let config = ServiceConfig::default();
    let renderer = PdfiumRenderer::new(&config).expect("libpdfium not found");
    let pages = renderer.render(&pdf, &config.render).unwrap();

    assert_eq!(pages.len(), 3);
    for page in &pages {
        assert!(page.width <= config.render.width);
        assert!(page.height <= config.render.height);
        // JPEG SOI marker
        assert_eq!(&page.data[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&page.data).unwrap();
        assert_eq!(decoded.width(), page.width);
    }
}

#[test]
fn test_render_png_pages() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_sample(dir.path(), 1);

    let config = ServiceConfig::builder()
        .page_format(PageFormat::Png)
        .build()
        .unwrap();
    let renderer = PdfiumRenderer::new(&config).expect("libpdfium not found");
    let options = RenderOptions {
        width: 300,
        height: 300,
        ..config.render.clone()
    };
    let pages = renderer.render(&pdf, &options).unwrap();

    assert_eq!(pages.len(), 1);
    assert!(pages[0].data.starts_with(b"\x89PNG"));
    assert!(pages[0].width <= 300 && pages[0].height <= 300);
}

#[test]
fn test_render_garbage_fails() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"%PDF-1.4\nthis is not a real document").unwrap();

    let config = ServiceConfig::default();
    let renderer = PdfiumRenderer::new(&config).expect("libpdfium not found");
    let err = renderer.render(&path, &config.render).unwrap_err();
    assert!(matches!(err, ConvertError::RenderFailure { .. }), "got {err:?}");
}

// ── Full conversion ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_sample_to_zip() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_sample(dir.path(), 2);
    let out = dir.path().join("sample.zip");

    let config = ServiceConfig::default();
    let renderer = Arc::new(PdfiumRenderer::new(&config).expect("libpdfium not found"));
    let stats = convert_to_file(&pdf, &out, renderer, &config).await.unwrap();
    println!("{}", serde_json::to_string_pretty(&stats).unwrap());

    assert_eq!(stats.page_count, 2);
    assert_eq!(stats.archive_bytes, std::fs::metadata(&out).unwrap().len());

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&out).unwrap()).unwrap();
    let names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names, ["page_1.jpg", "page_2.jpg"]);

    let mut first = Vec::new();
    zip.by_index(0).unwrap().read_to_end(&mut first).unwrap();
    assert!(image::load_from_memory(&first).is_ok());
}
