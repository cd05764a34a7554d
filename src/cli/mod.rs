//! Command-line surface: server modes plus catalog, one-shot call, and health helpers.

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use crate::config::HttpConfig;
use crate::error::FaersError;
use crate::mcp::FaersServer;
use crate::render::json::to_pretty;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "faers-mcp",
    version,
    about = "MCP server for FDA adverse event reports, drug labels, and recalls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server over stdio
    #[command(alias = "mcp")]
    Serve,

    /// Run the MCP server over streamable HTTP
    ServeHttp(HttpConfig),

    /// Print the tool catalog as JSON
    Tools,

    /// Invoke one tool and print its JSON result
    Call {
        /// Tool name, e.g. get_event_counts
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },

    /// Check connectivity to the openFDA endpoints
    Health,
}

fn parse_args(raw: Option<&str>) -> Result<Option<Map<String, Value>>, FaersError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(FaersError::InvalidArgument(
            "--args must be a JSON object".into(),
        )),
        Err(e) => Err(FaersError::InvalidArgument(format!(
            "--args is not valid JSON: {e}"
        ))),
    }
}

/// Runs the non-server commands and returns their output.
///
/// # Errors
///
/// Returns an error when the tool call fails or upstream checks cannot run.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Tools => Ok(to_pretty(&crate::mcp::catalog::catalog_json())?),
        Commands::Call { tool, args } => {
            let args = parse_args(args.as_deref())?;
            let server = FaersServer::new()?;
            let value = server.invoke(&tool, args).await?;
            Ok(to_pretty(&value)?)
        }
        Commands::Health => {
            let report = health::check_default().await?;
            if !report.all_healthy() {
                tracing::warn!(
                    healthy = report.healthy,
                    total = report.total,
                    "openFDA endpoints unhealthy"
                );
            }
            Ok(report.to_markdown())
        }
        Commands::Serve | Commands::ServeHttp(_) => Err(anyhow::anyhow!(
            "server commands are handled by the binary entrypoint"
        )),
    }
}
