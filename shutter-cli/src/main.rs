//! Shutter CLI
//!
//! Lifecycle-aware surface capture from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Capture the built-in test pattern to the default location
//! shutter capture
//!
//! # Capture to a file, blanking out two regions
//! shutter capture --output /tmp/a.png --exclude 0,0,100,40 --exclude 300,200,50,50
//!
//! # Create a config file
//! shutter config init
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Shutter - lifecycle-aware surface capture
#[derive(Parser)]
#[command(name = "shutter")]
#[command(version)]
#[command(about = "Lifecycle-aware surface capture orchestration", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the test-pattern surface to a PNG file
    #[command(alias = "snap")]
    Capture(commands::CaptureArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("shutter_core={}", level).parse()?)
                .add_directive(format!("shutter={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Capture(args) => commands::capture(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
