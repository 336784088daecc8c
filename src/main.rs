//! favscan - large file finder with a persistent metadata cache
//!
//! Entry point for the favscan CLI application.

use clap::Parser;
use favscan::{
    cli::Cli,
    error::{format_error, ExitCode},
};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match favscan::run_app(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let code = ExitCode::GeneralError;
            eprintln!("{}", format_error(&err, code));
            code.into()
        }
    }
}
