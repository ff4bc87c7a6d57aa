//! Core library entry for the `verdiff` CLI.
//!
//! `verdiff compare` indexes two directory trees of binary modules, reads a
//! version from each module and classifies every relative path. `verdiff
//! push-config` uploads a configuration file over `scp` and relocates it with
//! `ssh` + `sudo`.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod compare;
pub mod context;
pub mod deploy;
pub mod extract;
pub mod index;
pub mod ports;
pub mod report;
pub mod version;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "VERDIFF_LOG";

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    init_tracing(cli.verbose);
    commands::dispatch(&cli.command)
}

/// Installs the stderr log subscriber.
///
/// Filter directives come from `VERDIFF_LOG`, then `RUST_LOG`; without
/// either the level follows `verbosity` (`warn`, `info`, `debug`). Calling
/// this more than once keeps the first subscriber.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
