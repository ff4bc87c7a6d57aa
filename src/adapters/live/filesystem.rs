//! Live filesystem adapter using `std::fs` and `walkdir`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ports::filesystem::FileSystem;

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::canonicalize(path)?)
    }

    fn walk_files(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        if !root.is_dir() {
            return Err(format!("not a directory: {}", root.display()).into());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => tracing::warn!(root = %root.display(), error = %e, "skipping entry"),
            }
        }
        Ok(files)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(std::fs::write(path, contents)?)
    }
}
