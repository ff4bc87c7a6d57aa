//! Replaying adapter for the `FileSystem` port.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::filesystem::FileSystem;

/// Replays recorded filesystem operations from a cassette.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a new replaying filesystem from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn next_output(&self, method: &str) -> serde_json::Value {
        let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
        replayer.next_interaction("fs", method).output.clone()
    }

    fn next_bool(&self, method: &str) -> bool {
        self.next_output(method)
            .as_bool()
            .unwrap_or_else(|| panic!("fs::{method}: expected boolean output"))
    }
}

impl FileSystem for ReplayingFileSystem {
    fn exists(&self, _path: &Path) -> bool {
        self.next_bool("exists")
    }

    fn is_dir(&self, _path: &Path) -> bool {
        self.next_bool("is_dir")
    }

    fn is_file(&self, _path: &Path) -> bool {
        self.next_bool("is_file")
    }

    fn canonicalize(
        &self,
        _path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        extract_result(&self.next_output("canonicalize"), "fs::canonicalize")
    }

    fn walk_files(
        &self,
        _root: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        extract_result(&self.next_output("walk_files"), "fs::walk_files")
    }

    fn read(&self, _path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let encoded: String = extract_result(&self.next_output("read"), "fs::read")?;
        STANDARD.decode(encoded).map_err(|e| format!("fs::read: invalid base64: {e}").into())
    }

    fn write(
        &self,
        _path: &Path,
        _contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let output = self.next_output("write");
        if let Some(err) = output.get("err") {
            let msg = err.as_str().unwrap_or("unknown error").to_string();
            return Err(msg.into());
        }
        Ok(())
    }
}
