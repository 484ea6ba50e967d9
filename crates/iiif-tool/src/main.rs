//! Offline inspection of IIIF manifests.
//!
//! ```text
//! iiif-tool normalize manifest.json > manifest.v2.json
//! iiif-tool annotations manifest.json --canvas 2 --lang fr
//! ```
//!
//! Set `RUST_LOG=debug` for parser diagnostics.

mod commands;

use commands::{USAGE, execute, parse_args};
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("iiif-tool: {msg}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let path = command.path();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("iiif-tool: cannot read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let now = chrono::Local::now().naive_local();
    match execute(&command, &text, now) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::debug!("{e:?}");
            eprintln!("iiif-tool: {}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}
