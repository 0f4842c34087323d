//! Polycall - call a catalog endpoint and print the result map as JSON.

use std::process::ExitCode;

use polycall_cli::{parse_args, run, Command, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = polycall_infra::init_tracing() {
        eprintln!("warning: {e}");
    }

    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e:#}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let args = match command {
        Command::Help => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Command::Call(args) => args,
    };

    match run(&args).await {
        Ok(outcome) => {
            match serde_json::to_string_pretty(&outcome.result) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize result");
                    return ExitCode::FAILURE;
                }
            }
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = ?e, "call failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
