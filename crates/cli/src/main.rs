//! `MeCar` CLI - database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mecar-cli migrate
//!
//! # Load cars from a YAML file
//! mecar-cli seed cars --file crates/cli/seeds/cars.yaml
//!
//! # Replace all unsold cars with the file's contents
//! mecar-cli seed cars --file crates/cli/seeds/cars.yaml --clear
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mecar-cli")]
#[command(author, version, about = "MeCar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load catalog cars from a YAML file
    Cars {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Delete unsold cars before inserting
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Cars { file, clear } => commands::seed::cars(&file, clear).await?,
        },
    }
    Ok(())
}
