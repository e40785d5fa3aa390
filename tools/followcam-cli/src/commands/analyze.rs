//! Track motion without rendering and report trajectory statistics.

use std::path::PathBuf;

use followcam_common::AppConfig;
use followcam_model::TRACK_FILE;

use super::session::{self, RunSettings, TrackOptions};

pub async fn run(video: PathBuf, options: TrackOptions, config: AppConfig) -> anyhow::Result<()> {
    println!("Analyzing: {}", video.display());

    let settings = RunSettings::resolve(&video, &options, &config);
    let info = followcam_render::probe_video(&video)?;

    let cancel = session::spawn_cancel_listener();
    let outcome = tokio::task::spawn_blocking(move || {
        session::execute(video, settings, info, false, cancel)
    })
    .await??;

    if outcome.cancelled {
        println!("  Cancelled; statistics cover the frames processed so far.");
    }
    session::print_stats(&outcome.stats);
    println!(
        "  Track: {}",
        outcome.output_dir.join(TRACK_FILE).display()
    );

    Ok(())
}
