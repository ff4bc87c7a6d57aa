//! Binary entrypoint for the `verdiff` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine; VERDIFF_* can come from the real environment.
    let _ = dotenvy::dotenv();

    // Recording is handled in commands::dispatch via VERDIFF_RECORD=<dir>.
    match verdiff::run(std::env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
