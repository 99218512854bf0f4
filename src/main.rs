//! Shardgate binary: parses configuration, starts the listener and runs
//! until Ctrl-C.

use std::process::ExitCode;

use clap::Parser;
use shardgate::config::Args;
use shardgate::proxy::Server;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                return ExitCode::FAILURE;
            }
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    ExitCode::SUCCESS
}
