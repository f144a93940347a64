//! CLI frontend for the heroic dice engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "hd",
    about = "Heroic dice: spend hero dice to push an evaluated roll up or down",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a roll splits into target dice, multiplier, and keep rule
    Analyze {
        /// JSON file holding the evaluated roll
        file: PathBuf,
    },

    /// Apply heroic dice to a roll and print the result
    Roll {
        /// JSON file holding the evaluated roll
        file: PathBuf,

        /// Heroic dice spent from the actor's pool
        #[arg(short = 'n', long, default_value = "1")]
        heroic: u32,

        /// Extra heroic dice rolled for free
        #[arg(short, long, default_value = "0")]
        bonus: u32,

        /// Allocation mode: increase or decrease
        #[arg(short, long, default_value = "increase")]
        mode: String,

        /// Faces on each heroic die
        #[arg(short, long, default_value = "6")]
        faces: u32,

        /// RNG seed for reproducible rolls
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Actor's heroic dice balance (default: exactly what is spent)
        #[arg(long)]
        balance: Option<u32>,

        /// Mark the roll as healing
        #[arg(long)]
        healing: bool,

        /// Healing rolls always increase
        #[arg(long)]
        house_rule: bool,

        /// Print the outcome as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze { file } => commands::analyze::run(&file),
        Commands::Roll {
            file,
            heroic,
            bonus,
            mode,
            faces,
            seed,
            balance,
            healing,
            house_rule,
            json,
        } => {
            let opts = commands::roll::RollOptions {
                heroic,
                bonus,
                mode,
                faces,
                seed,
                balance,
                healing,
                house_rule,
                json,
            };
            commands::roll::run(&file, &opts).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
