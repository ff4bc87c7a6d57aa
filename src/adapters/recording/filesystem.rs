//! Recording adapter for the `FileSystem` port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use super::{record_interaction, record_result};
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::FileSystem;

/// Records filesystem interactions while delegating to an inner implementation.
pub struct RecordingFileSystem {
    inner: Box<dyn FileSystem>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingFileSystem {
    /// Creates a new recording filesystem wrapping the given implementation.
    pub fn new(inner: Box<dyn FileSystem>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct PathInput<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct WriteInput<'a> {
    path: &'a str,
    contents: &'a str,
}

impl FileSystem for RecordingFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let result = self.inner.exists(path);
        let input = PathInput { path: &path.display().to_string() };
        record_interaction(&self.recorder, "fs", "exists", &input, &result);
        result
    }

    fn is_dir(&self, path: &Path) -> bool {
        let result = self.inner.is_dir(path);
        let input = PathInput { path: &path.display().to_string() };
        record_interaction(&self.recorder, "fs", "is_dir", &input, &result);
        result
    }

    fn is_file(&self, path: &Path) -> bool {
        let result = self.inner.is_file(path);
        let input = PathInput { path: &path.display().to_string() };
        record_interaction(&self.recorder, "fs", "is_file", &input, &result);
        result
    }

    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.canonicalize(path);
        let input = PathInput { path: &path.display().to_string() };
        record_result(&self.recorder, "fs", "canonicalize", &input, &result);
        result
    }

    fn walk_files(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.walk_files(root);
        let input = PathInput { path: &root.display().to_string() };
        record_result(&self.recorder, "fs", "walk_files", &input, &result);
        result
    }

    /// Module contents are recorded as one base64 string.
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.read(path);
        let input = PathInput { path: &path.display().to_string() };
        let encoded = result.as_ref().map(|bytes| STANDARD.encode(bytes));
        record_result(&self.recorder, "fs", "read", &input, &encoded);
        result
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.write(path, contents);
        let input = WriteInput { path: &path.display().to_string(), contents };
        record_result(&self.recorder, "fs", "write", &input, &result);
        result
    }
}
