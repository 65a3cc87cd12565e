//! `pixz`: parallel, indexed XZ compression utility.

use std::process::ExitCode;

use pixz_cli::error::InvocationError;
use pixz_cli::{process, PixzOpts};

fn main() -> ExitCode {
    let opts = PixzOpts::parse();
    let config = match opts.config() {
        Ok(config) => config,
        Err(err) => {
            let invocation = InvocationError::new(err, "pixz", None);
            eprintln!("{invocation}");
            return ExitCode::from(invocation.exit_code() as u8);
        }
    };

    match process::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let file = config.input.as_deref().map(std::path::Path::new);
            let invocation = InvocationError::new(err, "pixz", file);
            eprintln!("{invocation}");
            ExitCode::from(invocation.exit_code() as u8)
        }
    }
}
