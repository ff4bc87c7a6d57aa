//! Version extraction from binary modules.
//!
//! Sources are tried in order: managed assembly metadata, then the native
//! `FileVersion` and `ProductVersion` resource strings.

pub mod clr;
pub mod pe;
pub mod resource;

use std::path::Path;

use tracing::debug;

use crate::ports::FileSystem;
use crate::version::Version;

use self::pe::PeImage;

/// Extracts a version from the raw bytes of a module.
///
/// Returns `None` when the bytes are not a PE image or carry no usable
/// version metadata.
#[must_use]
pub fn extract_version(bytes: &[u8]) -> Option<Version> {
    let image = PeImage::parse(bytes)?;

    if let Some(version) = clr::assembly_version(&image) {
        return Some(version.into());
    }

    let info = resource::version_info(&image)?;
    let version = [info.file_version.as_deref(), info.product_version.as_deref()]
        .into_iter()
        .flatten()
        .find_map(Version::from_text);
    version
}

/// Reads `path` through the filesystem port and extracts its version.
///
/// Read failures are logged and reported as an absent version.
pub fn read_version(fs: &dyn FileSystem, path: &Path) -> Option<Version> {
    let bytes = match fs.read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not read module");
            return None;
        }
    };
    let version = extract_version(&bytes);
    match &version {
        Some(v) => debug!(path = %path.display(), version = %v, "extracted version"),
        None => debug!(path = %path.display(), "no version metadata"),
    }
    version
}
