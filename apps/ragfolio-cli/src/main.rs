//! ragfolio CLI - inspect the portfolio retrieval pipeline.
//!
//! ```bash
//! ragfolio query "What cloud platforms have you used?"
//! ragfolio query "Quels sont tes projets ?" --json
//! ragfolio classify "Which certifications do you hold?"
//! ragfolio policy
//! ```

mod output;
mod wiring;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragfolio_core::config::Config;

#[derive(Parser)]
#[command(name = "ragfolio", version, about)]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the context block for a query
    Query {
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the detected category
    Classify { text: String },
    /// Print the effective retrieval policy
    Policy {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_from(&cli.config_dir)?;
    let settings = config.settings()?;

    match cli.command {
        Command::Query { text, json } => {
            let service = wiring::context_service(&settings).await?;
            let outcome = service.context_for(&text).await;
            if json {
                println!("{}", output::outcome_json(&text, &outcome)?);
            } else {
                println!("{}", output::outcome_human(&outcome));
            }
        }
        Command::Classify { text } => {
            let classifier = wiring::classifier(&settings)?;
            match classifier.classify(&text).await {
                Some(category) => println!("{}", category),
                None => println!("none"),
            }
        }
        Command::Policy { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings.retrieval)?);
            } else {
                println!("{}", output::policy_human(&settings.retrieval));
            }
        }
    }
    Ok(())
}
