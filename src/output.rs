//! Results of a conversion.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A finished, flushed archive waiting to be delivered.
#[derive(Debug, Clone)]
pub struct ConvertedArchive {
    /// Request token the archive is named after.
    pub id: Uuid,
    /// Location of the archive on disk.
    pub path: PathBuf,
    pub stats: ConversionStats,
}

impl ConvertedArchive {
    /// Download filename offered to the client: `<id>.zip`.
    pub fn download_name(&self) -> String {
        format!("{}.zip", self.id)
    }
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Number of pages rendered (and files in the archive).
    pub page_count: usize,
    /// Size of the uploaded PDF in bytes.
    pub input_bytes: u64,
    /// Size of the finished archive in bytes.
    pub archive_bytes: u64,
    pub render_duration_ms: u64,
    pub archive_duration_ms: u64,
}
