//! Filesystem port for file I/O operations.

use std::path::{Path, PathBuf};

/// Provides filesystem access for scanning trees and reading modules.
///
/// Abstracting the filesystem allows deterministic replay and testing
/// without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `true` if the path exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Resolves a path to its absolute, symlink-free form.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or cannot be resolved.
    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>>;

    /// Recursively lists every regular file below `root`.
    ///
    /// Entries are returned in a stable order (sorted by file name at each
    /// level). Entries that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` itself cannot be traversed.
    fn walk_files(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>>;

    /// Reads the entire contents of a file as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
