//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Per-port cassette file paths. Ports without a cassette path panic if
/// called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Path to the filesystem port cassette file.
    pub fs: Option<PathBuf>,
    /// Path to the shell port cassette file.
    pub shell: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Replayer for the filesystem port.
    pub fs: Option<CassetteReplayer>,
    /// Replayer for the shell port.
    pub shell: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Returns a config where all port paths are `None`.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Points every port at files inside a recording session directory
    /// (`fs.cassette.yaml`, `shell.cassette.yaml`), skipping files that
    /// do not exist.
    #[must_use]
    pub fn from_session_dir(dir: &Path) -> Self {
        let existing = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.is_file().then_some(path)
        };
        Self { fs: existing("fs"), shell: existing("shell") }
    }

    /// Load a single cassette file and create a replayer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_port_cassette(path: &Path) -> Result<CassetteReplayer, String> {
        Cassette::load(path).map(|cassette| CassetteReplayer::new(&cassette))
    }

    /// Load all configured per-port cassette files and create replayers.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            fs: self.fs.as_deref().map(Self::load_port_cassette).transpose()?,
            shell: self.shell.as_deref().map(Self::load_port_cassette).transpose()?,
        })
    }
}
