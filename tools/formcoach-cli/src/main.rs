//! FormCoach CLI: command-line interface for exercise analysis.
//!
//! Usage:
//!   formcoach analyze <STREAM>     Analyze a recorded pose stream
//!   formcoach live <STREAM>        Replay a pose stream through the live engine
//!   formcoach validate <STREAM>    Check a pose stream and print statistics
//!   formcoach synth <EXERCISE>     Write a synthetic pose stream
//!   formcoach config               Show or save the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formcoach_common::config::AppConfig;
use formcoach_pose_model::ExerciseLabel;

mod commands;

#[derive(Parser)]
#[command(
    name = "formcoach",
    about = "Exercise form analysis and rep counting from pose streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded pose stream and print the result record
    Analyze {
        /// Path to the pose stream (.jsonl)
        path: PathBuf,

        /// Write the result record here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analyze every Nth frame
        #[arg(long)]
        stride: Option<usize>,
    },

    /// Replay a pose stream through the live engine
    Live {
        /// Path to the pose stream (.jsonl)
        path: PathBuf,

        /// Enable spoken coaching
        #[arg(long)]
        voice: bool,

        /// Pace frames at the stream's frame rate and use wall-clock time
        #[arg(long)]
        realtime: bool,
    },

    /// Validate a pose stream
    Validate {
        /// Path to the pose stream (.jsonl)
        path: PathBuf,
    },

    /// Write a deterministic synthetic pose stream
    Synth {
        /// Exercise to perform: squat, bicep_curl, push_up, plank
        exercise: ExerciseLabel,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of repetitions
        #[arg(short, long, default_value = "5")]
        reps: usize,

        /// Frames per repetition
        #[arg(long, default_value = "30")]
        frames_per_rep: usize,

        /// Nominal frame rate
        #[arg(long, default_value = "30.0")]
        fps: f64,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    config.apply_env_overrides();

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    formcoach_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Analyze {
            path,
            output,
            stride,
        } => commands::analyze::run(&config, path, output, stride),
        Commands::Live {
            path,
            voice,
            realtime,
        } => commands::live::run(config, path, voice, realtime).await,
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Synth {
            exercise,
            output,
            reps,
            frames_per_rep,
            fps,
        } => commands::synth::run(exercise, output, reps, frames_per_rep, fps),
        Commands::Config { save } => commands::config::run(&config, cli.config, save),
    }
}
