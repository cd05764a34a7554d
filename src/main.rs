use clap::Parser;
use tracing_subscriber::EnvFilter;

use faers_mcp::cli::{Cli, Commands};

/// `RUST_LOG` wins, then `LOG_LEVEL`, then `warn`. Always stderr: stdout carries stdio JSON-RPC.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn exit_with(result: anyhow::Result<()>) -> std::process::ExitCode {
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal");
            eprintln!("Error: {err}");
            std::process::ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => exit_with(faers_mcp::mcp::run_stdio().await),
        Commands::ServeHttp(config) => exit_with(faers_mcp::mcp::run_http(config).await),
        _ => match faers_mcp::cli::run(cli).await {
            Ok(output) => {
                println!("{output}");
                std::process::ExitCode::SUCCESS
            }
            Err(err) => {
                if let Some(faers_err) = err.downcast_ref::<faers_mcp::error::FaersError>() {
                    eprintln!("Error: {faers_err}");
                } else {
                    eprintln!("Error: {err}");
                }
                std::process::ExitCode::from(1)
            }
        },
    }
}
