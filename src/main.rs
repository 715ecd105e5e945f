use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    neptune::cli::main().await
}
