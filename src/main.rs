//! DeFi Query Agent CLI
//!
//! Command-line interface for asking natural-language questions about
//! Sui DeFi markets.

use clap::{Parser, Subcommand};
use defi_query_agent::{AgentRunner, Config, Result};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "defi-query")]
#[command(about = "Ask questions about DeFi prices, pools and swap rates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question
    Ask {
        /// The question, e.g. "What is the price of SUI?"
        query: String,

        /// Use the built-in market snapshot instead of the analytics backend
        #[arg(long)]
        offline: bool,

        /// Print the full structured response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tools the planner may call
    Tools,

    /// List known token symbols
    Symbols,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // Logs go to stderr so answers on stdout stay pipeable
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            query,
            offline,
            json,
        } => {
            run_ask(config, &query, offline, json).await?;
        }
        Commands::Tools => {
            list_tools(config)?;
        }
        Commands::Symbols => {
            let runner = AgentRunner::new(config, true);
            for (symbol, id) in runner.symbol_table().entries() {
                println!("{:<8} {}", symbol, id);
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_ask(config: Config, query: &str, offline: bool, json: bool) -> Result<()> {
    tracing::info!(offline = offline, "Starting query agent");

    let runner = AgentRunner::new(config, offline);
    let agent = runner.build_agent()?;
    let response = runner.run_query(&agent, query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.text());
    }
    Ok(())
}

fn list_tools(config: Config) -> Result<()> {
    let runner = AgentRunner::new(config, true);
    let registry = runner.build_registry(runner.build_provider()?)?;

    for definition in registry.definitions() {
        println!("{}", definition.name);
        println!("  {}", definition.description);
        for param in &definition.parameters {
            let mut traits = vec![param.kind.name().to_string()];
            if let Some(default) = &param.default {
                traits.push(format!("default {}", default));
            } else if param.required {
                traits.push("required".to_string());
            }
            if param.asset_reference {
                traits.push("symbol".to_string());
            }
            println!("    {} ({}): {}", param.name, traits.join(", "), param.description);
        }
        println!("  returns {}", definition.output.describe());
    }
    Ok(())
}
