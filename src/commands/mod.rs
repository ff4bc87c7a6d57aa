//! Command dispatch and handlers.

pub mod compare;
pub mod push_config;

use std::env;
use std::path::PathBuf;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::context::ServiceContext;
use crate::deploy::DeployConfig;
use crate::report::CompareConfig;

/// Environment variable naming a directory to record port traffic into.
pub const RECORD_ENV: &str = "VERDIFF_RECORD";

/// Dispatch a parsed command to its handler.
///
/// When `VERDIFF_RECORD` is set to a directory path, all port interactions
/// are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let (ctx, session) = if let Ok(path) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(PathBuf::from(path))?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(), None)
    };

    let result = dispatch_with_context(command, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Compare { deploy, rollback, report, extension } => {
            let config = CompareConfig {
                deploy_root: deploy.clone(),
                rollback_root: rollback.clone(),
                report_path: report.clone(),
                extension: extension.clone(),
            };
            compare::run_with_context(ctx, &config)
        }
        Command::PushConfig {
            local_file,
            destination,
            staging_path,
            target_path,
            owner,
            group,
            mode,
        } => {
            let config = DeployConfig {
                local_file: local_file.clone(),
                destination: destination.clone(),
                staging_path: staging_path.clone(),
                target_path: target_path.clone(),
                owner: owner.clone(),
                group: group.clone(),
                mode: mode.clone(),
            };
            push_config::run_with_context(ctx, &config)
        }
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
