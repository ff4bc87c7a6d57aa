//! `verdiff push-config` command.

use crate::context::ServiceContext;
use crate::deploy::{self, DeployConfig};

/// Execute the `push-config` command.
///
/// # Errors
///
/// Returns an error string describing the failing step.
pub fn run_with_context(ctx: &ServiceContext, config: &DeployConfig) -> Result<(), String> {
    deploy::push_config(ctx, config).map_err(|e| format!("push-config failed: {e}"))?;
    println!(
        "Deployed {} to {}:{}",
        config.local_file.display(),
        config.destination,
        config.target_path
    );
    Ok(())
}
