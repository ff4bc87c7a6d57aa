//! `verdiff compare` command.

use tracing::warn;

use crate::context::ServiceContext;
use crate::report::{self, CompareConfig};

/// Execute the `compare` command.
///
/// Prints one line per compared module path and optionally writes the CSV
/// report. A failed report write is logged and does not fail the command.
///
/// # Errors
///
/// Returns an error string if either root cannot be resolved.
pub fn run_with_context(ctx: &ServiceContext, config: &CompareConfig) -> Result<(), String> {
    let rows = report::build_report(ctx, config)?;

    for row in &rows {
        println!("{}", row.format_line());
    }
    report::log_summary(&rows);

    if let Some(path) = &config.report_path {
        if let Err(e) = report::write_csv(ctx.fs.as_ref(), path, &rows) {
            warn!("{e}");
        }
    }
    Ok(())
}
