//! FollowCam CLI: motion tracking and virtual camera rendering.
//!
//! Usage:
//!   followcam track <VIDEO>      Track motion and render both videos
//!   followcam analyze <VIDEO>    Track motion and write track.jsonl only
//!   followcam info <RUN_DIR>     Show a saved run
//!   followcam check              Check for ffmpeg/ffprobe

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::session::TrackOptions;

#[derive(Parser)]
#[command(
    name = "followcam",
    about = "Follow the action in a video with a smooth virtual camera",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track motion and render annotated and viewport outputs
    Track {
        /// Input video file
        video: PathBuf,

        #[command(flatten)]
        options: TrackOptions,
    },

    /// Track motion and report trajectory statistics without rendering
    Analyze {
        /// Input video file
        video: PathBuf,

        #[command(flatten)]
        options: TrackOptions,
    },

    /// Show information about a saved run
    Info {
        /// Path to the run directory
        path: PathBuf,

        /// Print the raw manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check external tool availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = followcam_common::AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    followcam_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Track { video, options } => commands::track::run(video, options, config).await,
        Commands::Analyze { video, options } => {
            commands::analyze::run(video, options, config).await
        }
        Commands::Info { path, json } => commands::info::run(path, json),
        Commands::Check => commands::check::run(),
    }
}
