//! Replaying adapter for the `ShellExecutor` port.

use std::sync::Mutex;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::shell::{ShellExecutor, ShellOutput};

/// Replays recorded process results from a cassette.
pub struct ReplayingShellExecutor {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingShellExecutor {
    /// Creates a new replaying shell executor from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl ShellExecutor for ReplayingShellExecutor {
    fn run(
        &self,
        _program: &str,
        _args: &[String],
    ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            let interaction = replayer.next_interaction("shell", "run");
            interaction.output.clone()
        };
        extract_result(&output, "shell::run")
    }
}
