//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::shell::LiveShellExecutor;
use crate::adapters::recording::{RecordingFileSystem, RecordingShellExecutor};
use crate::adapters::replaying::{ReplayingFileSystem, ReplayingShellExecutor};
use crate::cassette::config::CassetteConfig;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::filesystem::FileSystem;
use crate::ports::shell::{ShellExecutor, ShellOutput};

/// Bundles all port trait objects into a single context.
///
/// Constructors wire up different adapter implementations (live,
/// recording, replaying).
pub struct ServiceContext {
    /// Filesystem for tree scans, module reads and report writes.
    pub fs: Box<dyn FileSystem>,
    /// Process runner for `scp` and `ssh`.
    pub shell: Box<dyn ShellExecutor>,
}

impl ServiceContext {
    /// Creates a live context backed by the real disk and real processes.
    #[must_use]
    pub fn live() -> Self {
        Self { fs: Box::new(LiveFileSystem), shell: Box::new(LiveShellExecutor) }
    }

    /// Creates a recording context whose cassettes land in a fresh
    /// timestamped directory below `base_dir`.
    ///
    /// The returned session must be finished after the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn recording_at(base_dir: PathBuf) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new_in(&base_dir)?;
        let ctx = Self {
            fs: Box::new(RecordingFileSystem::new(
                Box::new(LiveFileSystem),
                std::sync::Arc::clone(&session.fs),
            )),
            shell: Box::new(RecordingShellExecutor::new(
                Box::new(LiveShellExecutor),
                std::sync::Arc::clone(&session.shell),
            )),
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// Each port gets its own replayer over the same cassette so per-port
    /// cursors are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        Ok(Self {
            fs: Box::new(ReplayingFileSystem::new(CassetteReplayer::new(&cassette))),
            shell: Box::new(ReplayingShellExecutor::new(CassetteReplayer::new(&cassette))),
        })
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            fs: match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(PanickingFileSystem),
            },
            shell: match replayers.shell {
                Some(r) => Box::new(ReplayingShellExecutor::new(r)),
                None => Box::new(PanickingShellExecutor),
            },
        })
    }
}

// --- Panicking adapters for unspecified ports ---

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig: no cassette loaded for {port}");
}

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn is_dir(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn is_file(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn canonicalize(
        &self,
        _path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
    fn walk_files(
        &self,
        _root: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
    fn read(&self, _path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
    fn write(
        &self,
        _path: &Path,
        _contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
}

struct PanickingShellExecutor;
impl ShellExecutor for PanickingShellExecutor {
    fn run(
        &self,
        _program: &str,
        _args: &[String],
    ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("shell")
    }
}
