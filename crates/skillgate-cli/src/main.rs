//! skillgate - integrity gate for agent skill packages.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match skillgate_cli::run().await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
