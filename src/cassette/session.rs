//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Manages per-port `CassetteRecorder` instances for a recording session.
///
/// Each port gets its own recorder writing to a separate cassette file.
/// All cassettes are stored in a timestamped directory.
pub struct RecordingSession {
    /// Recorder for filesystem interactions.
    pub fs: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for shell interactions.
    pub shell: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Create a new recording session under `base_dir/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory already exists or cannot
    /// be created.
    pub fn new_in(base_dir: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = base_dir.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }

        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let commit = get_commit_hash();

        let make_recorder = |port: &str| -> Arc<Mutex<CassetteRecorder>> {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, &name, &commit)))
        };

        Ok(Self { fs: make_recorder("fs"), shell: make_recorder("shell"), output_dir })
    }

    /// Directory the cassettes are written into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Finish all recorders and write cassette files to disk. Ports with
    /// no interactions get no file.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter still holds a recorder or any cassette
    /// file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            if recorder.is_empty() {
                tracing::debug!(port, "no interactions recorded, skipping cassette");
                return Ok(());
            }
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.fs, "fs")?;
        finish_one(self.shell, "shell")?;

        Ok(self.output_dir)
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    let hash = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string());

    hash.unwrap_or_else(|| {
        tracing::warn!("could not get git commit hash, using 'unknown'");
        "unknown".to_string()
    })
}
