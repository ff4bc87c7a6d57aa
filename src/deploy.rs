//! Pushes a configuration file to a remote host and relocates it with
//! elevated privileges.
//!
//! The transfer is a single `scp` to a staging path followed by a single
//! `ssh` command that moves the file into place and fixes its ownership and
//! mode. There is no retry.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::context::ServiceContext;
use crate::ports::ShellOutput;

/// Remote path the file is copied to before relocation.
pub const DEFAULT_STAGING_PATH: &str = "/tmp/verdiff-config.upload";
/// Final remote location of the configuration file.
pub const DEFAULT_TARGET_PATH: &str = "/etc/app/app.config";
/// Owner applied to the relocated file.
pub const DEFAULT_OWNER: &str = "root";
/// Group applied to the relocated file.
pub const DEFAULT_GROUP: &str = "root";
/// Octal mode applied to the relocated file (owner rw, group r, other r).
pub const DEFAULT_MODE: &str = "644";

/// Inputs of a config push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Local file to upload.
    pub local_file: PathBuf,
    /// Remote destination in `user@host` form.
    pub destination: String,
    /// Remote staging path for the upload.
    pub staging_path: String,
    /// Remote final path.
    pub target_path: String,
    /// Owner set on the final file.
    pub owner: String,
    /// Group set on the final file.
    pub group: String,
    /// Mode set on the final file.
    pub mode: String,
}

impl DeployConfig {
    /// Config with the default remote paths, ownership and mode.
    #[must_use]
    pub fn new(local_file: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            local_file: local_file.into(),
            destination: destination.into(),
            staging_path: DEFAULT_STAGING_PATH.to_string(),
            target_path: DEFAULT_TARGET_PATH.to_string(),
            owner: DEFAULT_OWNER.to_string(),
            group: DEFAULT_GROUP.to_string(),
            mode: DEFAULT_MODE.to_string(),
        }
    }
}

/// Failure points of a config push.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The local file does not exist or is not a regular file.
    #[error("local file {0} does not exist or is not a regular file")]
    LocalFileMissing(PathBuf),
    /// The local path would be read as an option by `scp`.
    #[error("local file {0} must not start with '-'")]
    InvalidLocalFile(PathBuf),
    /// The destination is not of the form `user@host`.
    #[error("invalid destination '{0}': expected user@host")]
    InvalidDestination(String),
    /// `scp` exited unsuccessfully.
    #[error("transfer failed (scp exit code {code}): {stderr}")]
    Transfer {
        /// Exit code of `scp`.
        code: i32,
        /// Trimmed standard error of `scp`.
        stderr: String,
    },
    /// The remote move, ownership or mode change failed.
    #[error("relocate failed (ssh exit code {code}): {stderr}")]
    Relocate {
        /// Exit code of `ssh`.
        code: i32,
        /// Trimmed standard error of `ssh`.
        stderr: String,
    },
    /// A process could not be started.
    #[error("could not run {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        message: String,
    },
}

/// Uploads the file and relocates it on the remote host.
///
/// # Errors
///
/// Returns the first failing step as a [`DeployError`].
pub fn push_config(ctx: &ServiceContext, config: &DeployConfig) -> Result<(), DeployError> {
    validate_destination(&config.destination)?;
    if config.local_file.to_string_lossy().starts_with('-') {
        return Err(DeployError::InvalidLocalFile(config.local_file.clone()));
    }
    if !ctx.fs.is_file(&config.local_file) {
        return Err(DeployError::LocalFileMissing(config.local_file.clone()));
    }

    let local = config.local_file.display().to_string();
    let staged = format!("{}:{}", config.destination, config.staging_path);
    info!(file = %local, destination = %staged, "transferring");
    let output = run(ctx, "scp", &["--".to_string(), local, staged])?;
    if !output.success() {
        return Err(DeployError::Transfer {
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    let remote = relocate_command(config);
    info!(destination = %config.destination, target = %config.target_path, "relocating");
    let output = run(ctx, "ssh", &["--".to_string(), config.destination.clone(), remote])?;
    if !output.success() {
        return Err(DeployError::Relocate {
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(())
}

fn run(ctx: &ServiceContext, program: &str, args: &[String]) -> Result<ShellOutput, DeployError> {
    debug!(program, ?args, "running");
    ctx.shell
        .run(program, args)
        .map_err(|e| DeployError::Spawn { program: program.to_string(), message: e.to_string() })
}

/// Checks the `user@host` form with both parts non-empty.
///
/// Neither part may start with `-`, so `scp` and `ssh` never see the
/// destination as an option.
///
/// # Errors
///
/// Returns [`DeployError::InvalidDestination`] otherwise.
pub fn validate_destination(destination: &str) -> Result<(), DeployError> {
    match destination.split_once('@') {
        Some((user, host))
            if !user.is_empty()
                && !host.is_empty()
                && !user.starts_with('-')
                && !host.starts_with('-')
                && !host.contains('@')
                && !destination.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(DeployError::InvalidDestination(destination.to_string())),
    }
}

/// Remote command that moves the staged file into place and sets its
/// ownership and mode.
#[must_use]
pub fn relocate_command(config: &DeployConfig) -> String {
    let staged = shell_quote(&config.staging_path);
    let target = shell_quote(&config.target_path);
    let owner = shell_quote(&format!("{}:{}", config.owner, config.group));
    let mode = shell_quote(&config.mode);
    format!(
        "sudo mv {staged} {target} && sudo chown {owner} {target} && sudo chmod {mode} {target}"
    )
}

/// Single-quotes `value` for a POSIX shell.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::config::CassetteConfig;
    use crate::ports::{FileSystem, ShellExecutor};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

    /// Shell fake that records invocations and answers from a script.
    struct ScriptedShell {
        calls: Calls,
        outputs: Mutex<Vec<Result<ShellOutput, String>>>,
    }

    impl ShellExecutor for ScriptedShell {
        fn run(
            &self,
            program: &str,
            args: &[String],
        ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>> {
            self.calls.lock().unwrap().push((program.to_string(), args.to_vec()));
            self.outputs.lock().unwrap().remove(0).map_err(Into::into)
        }
    }

    /// Filesystem fake where only the listed paths are files.
    struct Files(Vec<PathBuf>);

    impl FileSystem for Files {
        fn exists(&self, path: &Path) -> bool {
            self.is_file(path)
        }
        fn is_dir(&self, _path: &Path) -> bool {
            false
        }
        fn is_file(&self, path: &Path) -> bool {
            self.0.iter().any(|p| p == path)
        }
        fn canonicalize(
            &self,
            path: &Path,
        ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
            Ok(path.to_path_buf())
        }
        fn walk_files(
            &self,
            _root: &Path,
        ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(Vec::new())
        }
        fn read(&self, _path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(Vec::new())
        }
        fn write(
            &self,
            _path: &Path,
            _contents: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    fn ok(exit_code: i32, stderr: &str) -> Result<ShellOutput, String> {
        Ok(ShellOutput { exit_code, stdout: String::new(), stderr: stderr.to_string() })
    }

    fn context(outputs: Vec<Result<ShellOutput, String>>) -> (ServiceContext, Calls) {
        let calls = Calls::default();
        let mut ctx = ServiceContext::replaying_from(&CassetteConfig::panic_on_unspecified())
            .expect("panic config should always succeed");
        ctx.fs = Box::new(Files(vec![PathBuf::from("app.config")]));
        ctx.shell = Box::new(ScriptedShell { calls: Arc::clone(&calls), outputs: Mutex::new(outputs) });
        (ctx, calls)
    }

    #[test]
    fn successful_push_runs_scp_then_ssh() {
        let (ctx, calls) = context(vec![ok(0, ""), ok(0, "")]);
        push_config(&ctx, &DeployConfig::new("app.config", "ops@web01")).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "scp");
        assert_eq!(calls[0].1, ["--", "app.config", "ops@web01:/tmp/verdiff-config.upload"]);
        assert_eq!(calls[1].0, "ssh");
        assert_eq!(calls[1].1[..2], ["--", "ops@web01"]);
        assert_eq!(
            calls[1].1[2],
            "sudo mv '/tmp/verdiff-config.upload' '/etc/app/app.config' \
             && sudo chown 'root:root' '/etc/app/app.config' \
             && sudo chmod '644' '/etc/app/app.config'"
        );
    }

    #[test]
    fn transfer_failure_skips_relocate() {
        let (ctx, calls) = context(vec![ok(1, "Permission denied (publickey).\n")]);
        let err = push_config(&ctx, &DeployConfig::new("app.config", "ops@web01")).unwrap_err();

        assert!(matches!(
            &err,
            DeployError::Transfer { code: 1, stderr } if stderr == "Permission denied (publickey)."
        ));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn relocate_failure_carries_ssh_exit_code() {
        let (ctx, _calls) = context(vec![ok(0, ""), ok(1, "sudo: a password is required")]);
        let err = push_config(&ctx, &DeployConfig::new("app.config", "ops@web01")).unwrap_err();
        assert_eq!(err.to_string(), "relocate failed (ssh exit code 1): sudo: a password is required");
    }

    #[test]
    fn spawn_failure_is_reported() {
        let (ctx, _calls) = context(vec![Err("No such file or directory".into())]);
        let err = push_config(&ctx, &DeployConfig::new("app.config", "ops@web01")).unwrap_err();
        assert!(matches!(err, DeployError::Spawn { ref program, .. } if program == "scp"));
    }

    #[test]
    fn missing_local_file_runs_nothing() {
        let (ctx, calls) = context(Vec::new());
        let err = push_config(&ctx, &DeployConfig::new("other.config", "ops@web01")).unwrap_err();
        assert!(matches!(err, DeployError::LocalFileMissing(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn local_file_starting_with_dash_runs_nothing() {
        let (ctx, calls) = context(Vec::new());
        let err = push_config(&ctx, &DeployConfig::new("-oProxyCommand=id", "ops@web01")).unwrap_err();
        assert!(matches!(err, DeployError::InvalidLocalFile(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn destination_must_be_user_at_host() {
        assert!(validate_destination("ops@web01").is_ok());
        for bad in [
            "web01",
            "@web01",
            "ops@",
            "a@b@c",
            "ops @web01",
            "",
            "-oProxyCommand=touch${IFS}/tmp/x@host",
            "ops@-oProxyCommand=id",
        ] {
            assert!(
                matches!(validate_destination(bad), Err(DeployError::InvalidDestination(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/etc/app"), "'/etc/app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn relocate_command_uses_custom_owner_and_mode() {
        let mut config = DeployConfig::new("app.config", "ops@web01");
        config.owner = "app".into();
        config.group = "staff".into();
        config.mode = "640".into();
        config.target_path = "/srv/app/app.config".into();
        let command = relocate_command(&config);
        assert!(command.contains("sudo chown 'app:staff' '/srv/app/app.config'"));
        assert!(command.ends_with("sudo chmod '640' '/srv/app/app.config'"));
    }
}
