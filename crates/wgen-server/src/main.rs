use std::process::ExitCode;

use clap::Parser;
use wgen_server::{init_logging, serve, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::parse();
    init_logging();

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
