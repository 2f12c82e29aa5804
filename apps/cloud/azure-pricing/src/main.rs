//! Azure Pricing
//!
//! Runs the Azure retail pricing tools from the command line.
//! Tool output is written to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_azure_pricing::{AzurePricingClient, PricingConfig, Tool, handle_tool_call};
use eyre::{Result, WrapErr};
use strum::IntoEnumIterator;
use tracing::info;

#[derive(Parser)]
#[command(name = "azure-pricing")]
#[command(about = "Query Azure retail prices through named pricing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tools
    Tools,

    /// Run one tool and print its output
    Call {
        /// Tool name, e.g. azure_price_search
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Check that the pricing endpoint answers
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = PricingConfig::from_env().wrap_err("Invalid pricing configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Tools => {
            for tool in Tool::iter() {
                println!("{:<24} {}", tool.name(), tool.description());
            }
        }

        Commands::Call { tool, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).wrap_err("--args must be a JSON object")?;

            info!(tool = %tool, base_url = %config.base_url, "Running tool");
            println!("{}", handle_tool_call(&config, &tool, arguments).await);
        }

        Commands::Health => {
            let mut client = AzurePricingClient::connect(config)?;
            let healthy = client.health_check().await?;
            client.close();

            println!("{}", if healthy { "ok" } else { "endpoint answered with no rows" });
        }
    }

    Ok(())
}
