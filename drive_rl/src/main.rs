//! # drive_rl
//!
//! Command-line entry point. `train` runs the training driver and saves the
//! final model; `evaluate` reports baseline episode returns.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drive_rl::app;
use drive_rl::settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "drive_rl", version, about = "Train driving policies against a simulator")]
struct Cli {
    /// JSON settings file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Simulator host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Simulator port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Seed for the policy's random number generator.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train and save `<model_dir>/<run_name>_final.json`.
    Train {
        #[arg(long)]
        total_timesteps: Option<usize>,
        #[arg(long)]
        run_name: Option<String>,
    },
    /// Run baseline episodes and print their returns.
    Evaluate {
        #[arg(long, default_value_t = 5)]
        episodes: usize,
        /// Step cap for episodes that never terminate.
        #[arg(long, default_value_t = 1_000)]
        max_steps: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(cli.config.as_deref())?;
    let mut overrides = Overrides { host: cli.host, port: cli.port, seed: cli.seed, ..Overrides::default() };

    match cli.command {
        Command::Train { total_timesteps, run_name } => {
            overrides.total_timesteps = total_timesteps;
            overrides.run_name = run_name;
            settings.apply(&overrides);
            let outcome = app::train(&settings)?;
            println!(
                "trained {} steps over {} episodes, model saved to {}",
                outcome.report.timesteps,
                outcome.report.episodes,
                outcome.checkpoint.display()
            );
        }
        Command::Evaluate { episodes, max_steps } => {
            settings.apply(&overrides);
            for summary in app::evaluate(&settings, episodes, max_steps)? {
                println!("{}", serde_json::to_string(&summary)?);
            }
        }
    }
    Ok(())
}
