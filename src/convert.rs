//! Conversion entry points.
//!
//! [`convert_upload`] drives one HTTP request through render → write →
//! archive inside its [`Workspace`]. It never cleans up: the caller owns the
//! workspace and decides, based on the outcome, whether to discard it or to
//! hand it to the response body.
//!
//! [`convert_to_file`] runs the same stages offline for a PDF already on
//! disk, using a scratch directory that disappears on return.

use crate::config::ServiceConfig;
use crate::error::ConvertError;
use crate::lifecycle::{PhaseTracker, RequestPhase};
use crate::output::{ConversionStats, ConvertedArchive};
use crate::pipeline::render::PageRenderer;
use crate::pipeline::upload::{check_magic, PDF_MAGIC};
use crate::pipeline::workspace::Workspace;
use crate::pipeline::{archive, cleanup, render};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::info;

/// Convert the uploaded PDF in `workspace` into a flushed zip archive.
///
/// Advances `tracker` through `Rendering`, `Writing` and `Archiving`. On
/// error the tracker is left in the phase that failed.
pub async fn convert_upload(
    workspace: &mut Workspace,
    input_bytes: u64,
    renderer: Arc<dyn PageRenderer>,
    config: &ServiceConfig,
    tracker: &mut PhaseTracker,
) -> Result<ConvertedArchive, ConvertError> {
    let request_id = workspace.id();

    // ── Render ───────────────────────────────────────────────────────────
    tracker.advance(RequestPhase::Rendering)?;
    workspace.create_output_dir().await?;
    let render_start = Instant::now();
    let pages = render::render_pages(
        renderer,
        workspace.upload_path(),
        &config.render,
        config.render_timeout(),
    )
    .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(%request_id, "Rendered {} pages in {}ms", pages.len(), render_duration_ms);

    // ── Write page files ─────────────────────────────────────────────────
    tracker.advance(RequestPhase::Writing)?;
    let archive_start = Instant::now();
    archive::write_pages(
        workspace.output_dir(),
        &pages,
        config.render.format.extension(),
    )
    .await?;
    let page_count = pages.len();
    drop(pages);

    // ── Compress ─────────────────────────────────────────────────────────
    tracker.advance(RequestPhase::Archiving)?;
    let archive_bytes = archive::build_archive(
        workspace.output_dir(),
        workspace.archive_path(),
        config.compression_level,
    )
    .await?;
    workspace.mark_archive_created();
    let archive_duration_ms = archive_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        page_count,
        input_bytes,
        archive_bytes,
        render_duration_ms,
        archive_duration_ms,
    };
    info!(
        %request_id,
        "Archive ready: {} pages, {} bytes, {}ms",
        stats.page_count, stats.archive_bytes, stats.archive_duration_ms
    );

    Ok(ConvertedArchive {
        id: request_id,
        path: workspace.archive_path().to_path_buf(),
        stats,
    })
}

/// Convert a PDF on disk straight into a zip archive at `output_path`.
///
/// The archive is written next to `output_path` under a temporary name and
/// renamed into place, so a failed run never leaves a partial zip behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    renderer: Arc<dyn PageRenderer>,
    config: &ServiceConfig,
) -> Result<ConversionStats, ConvertError> {
    let input = input_path.as_ref();
    let output = output_path.as_ref();
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ConvertError::Workspace { path, source }
    };

    let mut file = tokio::fs::File::open(input).await.map_err(io_err(input))?;
    let input_bytes = file.metadata().await.map_err(io_err(input))?.len();
    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    (&mut file)
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .await
        .map_err(io_err(input))?;
    check_magic(&head)?;
    drop(file);

    let scratch = tempfile::Builder::new()
        .prefix("pdf2zip-")
        .tempdir()
        .map_err(io_err(std::env::temp_dir().as_path()))?;

    let render_start = Instant::now();
    let pages =
        render::render_pages(renderer, input, &config.render, config.render_timeout()).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let archive_start = Instant::now();
    archive::write_pages(scratch.path(), &pages, config.render.format.extension()).await?;
    let page_count = pages.len();
    drop(pages);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_err(parent))?;
    }
    let tmp_path = output.with_extension("zip.tmp");
    cleanup::remove_file(&tmp_path)
        .await
        .map_err(io_err(tmp_path.as_path()))?;

    let archive_bytes = match archive::build_archive(
        scratch.path(),
        &tmp_path,
        config.compression_level,
    )
    .await
    {
        Ok(size) => size,
        Err(e) => {
            let _ = cleanup::remove_file(&tmp_path).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&tmp_path, output).await {
        let _ = cleanup::remove_file(&tmp_path).await;
        return Err(ConvertError::ArchiveFailure {
            path: output.to_path_buf(),
            detail: e.to_string(),
        });
    }

    let stats = ConversionStats {
        page_count,
        input_bytes,
        archive_bytes,
        render_duration_ms,
        archive_duration_ms: archive_start.elapsed().as_millis() as u64,
    };
    info!(
        "Converted {} → {} ({} pages, {} bytes)",
        input.display(),
        output.display(),
        stats.page_count,
        stats.archive_bytes
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderOptions;
    use crate::pipeline::render::RenderedPage;

    struct CountingRenderer(usize);

    impl PageRenderer for CountingRenderer {
        fn render(&self, _: &Path, _: &RenderOptions) -> Result<Vec<RenderedPage>, ConvertError> {
            Ok((1..=self.0)
                .map(|n| RenderedPage {
                    data: format!("page {n}").into_bytes(),
                    width: 1,
                    height: 1,
                })
                .collect())
        }
    }

    fn config_in(root: &Path) -> ServiceConfig {
        let config = ServiceConfig::builder()
            .upload_dir(root.join("uploads"))
            .output_dir(root.join("output"))
            .cleanup_grace_ms(0)
            .build()
            .unwrap();
        std::fs::create_dir_all(&config.upload_dir).unwrap();
        std::fs::create_dir_all(&config.output_dir).unwrap();
        config
    }

    #[tokio::test]
    async fn convert_upload_walks_all_phases() {
        let root = tempfile::tempdir().unwrap();
        let config = config_in(root.path());
        let (mut ws, file) = Workspace::create(&config).await.unwrap();
        drop(file);
        tokio::fs::write(ws.upload_path(), b"%PDF-1.4").await.unwrap();

        let mut tracker = PhaseTracker::new(ws.id());
        let archive = convert_upload(
            &mut ws,
            8,
            Arc::new(CountingRenderer(3)),
            &config,
            &mut tracker,
        )
        .await
        .unwrap();

        assert_eq!(tracker.phase(), RequestPhase::Archiving);
        assert_eq!(archive.stats.page_count, 3);
        assert_eq!(archive.download_name(), format!("{}.zip", ws.id()));
        assert!(archive.path.exists());
        assert!(ws.output_dir().join("page_3.jpg").exists());
        ws.discard().await;
        assert!(!archive.path.exists());
    }

    #[tokio::test]
    async fn output_dir_collision_fails_during_rendering() {
        let root = tempfile::tempdir().unwrap();
        let config = config_in(root.path());
        let (mut ws, file) = Workspace::create(&config).await.unwrap();
        drop(file);
        std::fs::create_dir(ws.output_dir()).unwrap();

        let mut tracker = PhaseTracker::new(ws.id());
        let err = convert_upload(
            &mut ws,
            0,
            Arc::new(CountingRenderer(1)),
            &config,
            &mut tracker,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ConvertError::Workspace { .. }), "got {err:?}");
        assert_eq!(tracker.phase(), RequestPhase::Rendering);
        tracker.fail();
        assert_eq!(tracker.phase(), RequestPhase::Failed);
        ws.discard().await;
    }

    #[tokio::test]
    async fn convert_to_file_writes_archive_atomically() {
        let root = tempfile::tempdir().unwrap();
        let config = config_in(root.path());
        let input = root.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.7 fake").unwrap();
        let output = root.path().join("nested/out.zip");

        let stats = convert_to_file(&input, &output, Arc::new(CountingRenderer(2)), &config)
            .await
            .unwrap();

        assert_eq!(stats.page_count, 2);
        assert_eq!(stats.input_bytes, 13);
        assert!(output.exists());
        assert!(!output.with_extension("zip.tmp").exists());
        let zip = zip::ZipArchive::new(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
    }

    #[tokio::test]
    async fn convert_to_file_rejects_non_pdf() {
        let root = tempfile::tempdir().unwrap();
        let config = config_in(root.path());
        let input = root.path().join("in.txt");
        std::fs::write(&input, b"hello").unwrap();
        let err = convert_to_file(
            &input,
            root.path().join("out.zip"),
            Arc::new(CountingRenderer(1)),
            &config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::NotAPdf { .. }));
    }
}
