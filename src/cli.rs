//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::deploy::{
    DEFAULT_GROUP, DEFAULT_MODE, DEFAULT_OWNER, DEFAULT_STAGING_PATH, DEFAULT_TARGET_PATH,
};

/// Top-level CLI parser for `verdiff`.
#[derive(Debug, Parser)]
#[command(name = "verdiff", version, about = "Compare module versions between deploy trees")]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare module versions between a deploy tree and a rollback tree.
    Compare {
        /// Root of the tree being deployed.
        #[arg(env = "VERDIFF_DEPLOY_ROOT", default_value = "./deploy")]
        deploy: PathBuf,
        /// Root of the tree kept for rollback.
        #[arg(env = "VERDIFF_ROLLBACK_ROOT", default_value = "./rollback")]
        rollback: PathBuf,
        /// Also write the rows to this CSV file.
        #[arg(long, value_name = "CSV")]
        report: Option<PathBuf>,
        /// Module file extension.
        #[arg(long, default_value = "dll")]
        extension: String,
    },
    /// Upload a config file to a remote host and move it into place.
    PushConfig {
        /// Local file to upload.
        local_file: PathBuf,
        /// Remote destination, `user@host`.
        destination: String,
        /// Remote path the file is uploaded to first.
        #[arg(long, default_value = DEFAULT_STAGING_PATH)]
        staging_path: String,
        /// Remote path the file is moved to.
        #[arg(long, default_value = DEFAULT_TARGET_PATH)]
        target_path: String,
        /// Owner of the final file.
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Group of the final file.
        #[arg(long, default_value = DEFAULT_GROUP)]
        group: String,
        /// Mode of the final file.
        #[arg(long, default_value = DEFAULT_MODE)]
        mode: String,
    },
}
