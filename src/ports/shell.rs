//! Shell executor port for running external commands.

use serde::{Deserialize, Serialize};

/// The output of a command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutput {
    /// The exit code of the process.
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl ShellOutput {
    /// Returns `true` when the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes external programs.
///
/// Arguments are handed to the program as-is, never re-split by a local
/// shell, so paths with spaces survive intact.
pub trait ShellExecutor: Send + Sync {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned.
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>>;
}
