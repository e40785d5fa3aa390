//! Track motion in a video and render the virtual camera.

use std::path::PathBuf;

use followcam_common::AppConfig;

use super::session::{self, RunSettings, TrackOptions};

pub async fn run(video: PathBuf, options: TrackOptions, config: AppConfig) -> anyhow::Result<()> {
    println!("Tracking: {}", video.display());

    let settings = RunSettings::resolve(&video, &options, &config);
    let info = followcam_render::probe_video(&video)?;
    println!(
        "  Source: {}x{} @ {:.2}fps{}",
        info.width,
        info.height,
        info.fps,
        info.frame_count
            .map(|n| format!(", {n} frames"))
            .unwrap_or_default()
    );
    println!(
        "  Processing at {} with a {} viewport ({} filter)",
        settings.frame_size,
        settings.viewport,
        settings.filter.name()
    );

    let cancel = session::spawn_cancel_listener();
    let outcome = tokio::task::spawn_blocking(move || {
        session::execute(video, settings, info, true, cancel)
    })
    .await??;

    println!();
    if outcome.cancelled {
        println!("Cancelled. Partial outputs were kept.");
    } else {
        println!("Done.");
    }
    session::print_stats(&outcome.stats);
    println!("  Output: {}", outcome.output_dir.display());

    Ok(())
}
