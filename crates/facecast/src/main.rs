//! Facecast - headless character performance runner
//!
//! Plays a dialogue clip through the performance orchestrator against a
//! simulated rig, and inspects configuration files.

mod logging_setup;
mod runner;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecast_core::{FacecastConfig, Timeline};
use runner::RunOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Facecast - lip sync and emotion timeline performance runner
#[derive(Parser)]
#[command(name = "facecast", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Perform a clip headlessly and print a summary
    Run {
        /// Configuration file (TOML)
        #[arg(short, long, env = "FACECAST_CONFIG")]
        config: Option<PathBuf>,
        /// Dialogue clip (WAV); a synthesized voice is used otherwise
        #[arg(long)]
        wav: Option<PathBuf>,
        /// Length of the synthesized clip in seconds
        #[arg(long, default_value = "9.0", conflicts_with = "wav")]
        clip_length: f64,
        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,
        /// Play requests fired at start (extra ones coalesce)
        #[arg(long, default_value = "1")]
        plays: u32,
        /// Clip length of simulated animator states, in seconds
        #[arg(long, default_value = "1.5")]
        state_length: f64,
        /// Blendshapes on the simulated face mesh
        #[arg(long, default_value = "16")]
        blendshapes: usize,
        /// Stop after this much simulated time
        #[arg(long, default_value = "600")]
        max_seconds: f64,
    },
    /// Load and validate a configuration file
    CheckConfig {
        /// Configuration file (TOML)
        path: PathBuf,
    },
    /// Print the default configuration as TOML
    PrintConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            config,
            wav,
            clip_length,
            fps,
            plays,
            state_length,
            blendshapes,
            max_seconds,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => FacecastConfig::default(),
            };
            let _log_guard = logging_setup::init(&config.logging, cli.verbose)?;

            let options = RunOptions {
                wav,
                clip_length,
                fps,
                plays,
                state_length,
                blendshapes,
                max_seconds,
            };
            let summary = runner::run(&options, &config)?;
            println!("{}", summary);
            Ok(())
        }
        Command::CheckConfig { path } => {
            let config = load_config(&path)?;
            let timeline = config.timeline.build()?;
            let flavour = match timeline {
                Timeline::Scheduled(_) => "scheduled",
                Timeline::AnimationDriven(_) => "animation-driven",
            };
            println!(
                "{}: ok ({} timeline, {} phase(s), mouth shape {})",
                path.display(),
                flavour,
                timeline.len(),
                config
                    .lip_sync
                    .mouth_shape_index
                    .map_or_else(|| "unset".to_string(), |i| i.to_string())
            );
            Ok(())
        }
        Command::PrintConfig => {
            print!("{}", FacecastConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<FacecastConfig> {
    FacecastConfig::load(path).with_context(|| format!("Failed to load config {:?}", path))
}
