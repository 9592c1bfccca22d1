//! Archive building: page files on disk, then one zip of the directory.
//!
//! Pages are first written as `page_<n>.<ext>` (1-indexed, render order)
//! and the whole directory is then compressed, entries at the archive root.
//! The archive itself lives in the same directory and is skipped while
//! walking it.
//!
//! [`build_archive`] only returns once the zip central directory has been
//! written and the file synced to disk. Nothing downstream may touch the
//! archive before that, or it would read a truncated file.

use crate::error::ConvertError;
use crate::pipeline::render::RenderedPage;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name for the 1-indexed page `number`.
pub fn page_file_name(number: usize, extension: &str) -> String {
    format!("page_{number}.{extension}")
}

/// Write each page to `dir`, numbered from 1 in slice order.
///
/// Returns the written paths in the same order.
pub async fn write_pages(
    dir: &Path,
    pages: &[RenderedPage],
    extension: &str,
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut written = Vec::with_capacity(pages.len());
    for (idx, page) in pages.iter().enumerate() {
        let path = dir.join(page_file_name(idx + 1, extension));
        tokio::fs::write(&path, &page.data)
            .await
            .map_err(|e| ConvertError::ArchiveFailure {
                path: path.clone(),
                detail: format!("writing page {}: {e}", idx + 1),
            })?;
        written.push(path);
    }
    debug!("Wrote {} page files to {}", written.len(), dir.display());
    Ok(written)
}

/// Compress the contents of `source_dir` into `archive_path`.
///
/// Runs on the blocking pool; resolves after the archive is closed and
/// flushed. Returns the archive size in bytes.
pub async fn build_archive(
    source_dir: &Path,
    archive_path: &Path,
    compression_level: i64,
) -> Result<u64, ConvertError> {
    let source = source_dir.to_path_buf();
    let target = archive_path.to_path_buf();
    tokio::task::spawn_blocking(move || build_archive_blocking(&source, &target, compression_level))
        .await
        .map_err(|e| ConvertError::ArchiveFailure {
            path: archive_path.to_path_buf(),
            detail: format!("Archive task panicked: {e}"),
        })?
}

/// Blocking implementation of [`build_archive`].
pub fn build_archive_blocking(
    source_dir: &Path,
    archive_path: &Path,
    compression_level: i64,
) -> Result<u64, ConvertError> {
    let fail = |detail: String| ConvertError::ArchiveFailure {
        path: archive_path.to_path_buf(),
        detail,
    };

    let entries = collect_entries(source_dir, archive_path).map_err(|e| fail(e.to_string()))?;

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(archive_path)
        .map_err(|e| fail(e.to_string()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level))
        .unix_permissions(0o644);

    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| fail(format!("{name}: {e}")))?;
        let mut src = File::open(path).map_err(|e| fail(format!("{name}: {e}")))?;
        io::copy(&mut src, &mut zip).map_err(|e| fail(format!("{name}: {e}")))?;
    }

    let writer = zip.finish().map_err(|e| fail(e.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|e| fail(e.into_error().to_string()))?;
    file.sync_all().map_err(|e| fail(e.to_string()))?;
    let size = file.metadata().map_err(|e| fail(e.to_string()))?.len();

    debug!(
        "Archived {} entries into {} ({} bytes)",
        entries.len(),
        archive_path.display(),
        size
    );
    Ok(size)
}

/// Every regular file under `root` (recursively) except `exclude`, as
/// `(archive name, path)` pairs. Names use `/` separators and are ordered
/// by page number where one is present, then by name.
fn collect_entries(root: &Path, exclude: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let kind = entry.file_type()?;
            if kind.is_dir() {
                pending.push(path);
            } else if kind.is_file() && path != exclude {
                let name = path
                    .strip_prefix(root)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                entries.push((name, path));
            }
        }
    }

    entries.sort_by(|(a, _), (b, _)| {
        (page_number(a), a.as_str()).cmp(&(page_number(b), b.as_str()))
    });
    Ok(entries)
}

/// Page number encoded in a `page_<n>.<ext>` name.
fn page_number(name: &str) -> Option<usize> {
    let stem = name.rsplit('/').next()?.strip_prefix("page_")?;
    stem.split('.').next()?.parse().ok()
}
