//! Joins two directory indexes into comparison rows and renders them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compare::{compare_versions, Status};
use crate::context::ServiceContext;
use crate::index::{build_index, DirectoryIndex, ModuleRecord};
use crate::ports::FileSystem;
use crate::version::Version;

const CSV_HEADER: &str =
    "FileName,RelativePath,DeployVersion,RollbackVersion,Status,DeployFullPath,RollbackFullPath";

/// Inputs of a comparison run. Defaults are applied by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareConfig {
    /// Root of the tree being deployed.
    pub deploy_root: PathBuf,
    /// Root of the tree kept for rollback.
    pub rollback_root: PathBuf,
    /// Where to write the CSV report, if anywhere.
    pub report_path: Option<PathBuf>,
    /// Module file extension, with or without a leading dot.
    pub extension: String,
}

/// One compared module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    /// Last segment of the relative path.
    pub file_name: String,
    /// Relative path for display, deploy casing preferred.
    pub relative_path: String,
    /// Version found in the deploy tree.
    pub deploy_version: Option<Version>,
    /// Version found in the rollback tree.
    pub rollback_version: Option<Version>,
    /// Classification of the pair.
    pub status: Status,
    /// Full path in the deploy tree, if present there.
    pub deploy_full_path: Option<PathBuf>,
    /// Full path in the rollback tree, if present there.
    pub rollback_full_path: Option<PathBuf>,
}

impl ComparisonRow {
    fn join(key: &str, deploy: Option<&ModuleRecord>, rollback: Option<&ModuleRecord>) -> Self {
        let relative_path = deploy
            .or(rollback)
            .map_or_else(|| key.to_string(), |r| r.relative_path.clone());
        let file_name = relative_path.rsplit('/').next().unwrap_or_default().to_string();
        let deploy_version = deploy.and_then(|r| r.version.clone());
        let rollback_version = rollback.and_then(|r| r.version.clone());
        let status = compare_versions(deploy_version.as_ref(), rollback_version.as_ref());

        Self {
            file_name,
            relative_path,
            deploy_version,
            rollback_version,
            status,
            deploy_full_path: deploy.map(|r| r.full_path.clone()),
            rollback_full_path: rollback.map(|r| r.full_path.clone()),
        }
    }

    /// Console line for this row.
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{} -> deploy {}, rollback {} ({})",
            self.relative_path,
            display_or_missing(self.deploy_version.as_ref()),
            display_or_missing(self.rollback_version.as_ref()),
            self.status
        )
    }
}

fn display_or_missing(version: Option<&Version>) -> String {
    version.map_or_else(|| "missing".to_string(), ToString::to_string)
}

/// Validates both roots, indexes them and joins the results.
///
/// Rows come back sorted by normalized key.
///
/// # Errors
///
/// Returns an error naming the side and path if either root is not an
/// existing directory or cannot be resolved.
pub fn build_report(
    ctx: &ServiceContext,
    config: &CompareConfig,
) -> Result<Vec<ComparisonRow>, String> {
    let deploy_root = resolve_root(ctx.fs.as_ref(), &config.deploy_root, "deploy")?;
    let rollback_root = resolve_root(ctx.fs.as_ref(), &config.rollback_root, "rollback")?;

    let deploy = build_index(ctx.fs.as_ref(), &deploy_root, &config.extension);
    let rollback = build_index(ctx.fs.as_ref(), &rollback_root, &config.extension);

    Ok(join_indexes(&deploy, &rollback))
}

fn resolve_root(fs: &dyn FileSystem, path: &Path, side: &str) -> Result<PathBuf, String> {
    if !fs.is_dir(path) {
        return Err(format!("{side} root {} is not an existing directory", path.display()));
    }
    fs.canonicalize(path)
        .map_err(|e| format!("Failed to resolve {side} root {}: {e}", path.display()))
}

/// Joins two indexes over the union of their keys.
#[must_use]
pub fn join_indexes(deploy: &DirectoryIndex, rollback: &DirectoryIndex) -> Vec<ComparisonRow> {
    let keys: BTreeSet<&String> = deploy.keys().chain(rollback.keys()).collect();
    keys.into_iter().map(|key| ComparisonRow::join(key, deploy.get(key), rollback.get(key))).collect()
}

/// Counts rows per status, in status declaration order.
#[must_use]
pub fn status_counts(rows: &[ComparisonRow]) -> BTreeMap<Status, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.status).or_insert(0) += 1;
    }
    counts
}

/// Logs the per-status summary at info level.
pub fn log_summary(rows: &[ComparisonRow]) {
    info!(rows = rows.len(), "comparison finished");
    for (status, count) in status_counts(rows) {
        info!(%status, count, "status summary");
    }
}

/// Renders rows as CSV with a header. No rows renders as an empty string.
#[must_use]
pub fn to_csv(rows: &[ComparisonRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        let version = |v: Option<&Version>| v.map(ToString::to_string).unwrap_or_default();
        let path = |p: Option<&PathBuf>| p.map(|p| p.display().to_string()).unwrap_or_default();
        let fields = [
            row.file_name.clone(),
            row.relative_path.clone(),
            version(row.deploy_version.as_ref()),
            version(row.rollback_version.as_ref()),
            row.status.to_string(),
            path(row.deploy_full_path.as_ref()),
            path(row.rollback_full_path.as_ref()),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Quotes a CSV field when it contains a comma, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Writes the CSV rendering of `rows` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_csv(fs: &dyn FileSystem, path: &Path, rows: &[ComparisonRow]) -> Result<(), String> {
    fs.write(path, &to_csv(rows))
        .map_err(|e| format!("Failed to write report {}: {e}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "wrote report");
    Ok(())
}
