//! Base image extraction.
//!
//! The read-only layer is materialised by unpacking a tar archive, plain or
//! gzip-compressed, directly into the layer directory.

use std::path::Path;

use burrow_common::error::{BurrowError, Result};

/// Extracts a tar archive into `target`, which must already exist.
///
/// Supports both plain `.tar` and gzip-compressed `.tar.gz` / `.tgz` archives.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or unpacked.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<()> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting base layer"
    );

    let file = std::fs::File::open(archive_path).map_err(|e| BurrowError::io(archive_path, e))?;

    let unpacked = if is_gzip_archive(archive_path) {
        let decoder = flate2::read::GzDecoder::new(file);
        tar::Archive::new(decoder).unpack(target)
    } else {
        tar::Archive::new(file).unpack(target)
    };
    unpacked.map_err(|e| BurrowError::io(target, e))?;

    tracing::debug!(target = %target.display(), "base layer extracted");
    Ok(())
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}
