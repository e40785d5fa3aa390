//! Show information about a saved run.

use std::path::PathBuf;

use followcam_tracking::TrajectoryStats;

use super::session::{load_run, print_stats};

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let run = load_run(&path)?;
    let m = &run.manifest;

    if json {
        println!("{}", serde_json::to_string_pretty(m)?);
        return Ok(());
    }

    println!("Run: {}", m.name);
    println!("  ID: {}", m.id);
    println!("  Created: {}", m.created_at);
    println!();

    println!("Source:");
    println!("  Path: {}", m.source.path);
    println!(
        "  Resolution: {}x{} @ {:.2}fps",
        m.source.width, m.source.height, m.source.fps
    );
    if let Some(frames) = m.source.frame_count {
        println!("  Frames: {frames}");
    }
    println!();

    println!("Sampling:");
    println!(
        "  Every {} frame(s) -> {:.2}fps (target {:.2})",
        m.sampling.interval, m.sampling.sampled_fps, m.sampling.target_fps
    );
    println!("  Processing size: {}", m.sampling.frame_size());
    println!("  Viewport: {}", m.viewport);
    println!();

    println!("Tracking:");
    println!("  Filter: {}", m.tracking.filter);
    for (name, value) in &m.tracking.parameters {
        println!("    {name}: {value}");
    }
    println!();

    println!("Trajectory:");
    print_stats(&TrajectoryStats::from_records(&run.records));
    println!();

    println!("Outputs:");
    let outputs = [
        ("Annotated video", &m.outputs.annotated_video),
        ("Viewport video", &m.outputs.viewport_video),
        ("Frames", &m.outputs.frames_dir),
        ("Viewport frames", &m.outputs.viewport_dir),
        ("Track", &m.outputs.track),
    ];
    for (label, entry) in outputs {
        if let Some(relative) = entry {
            println!("  {label}: {relative}");
        }
    }

    let errors = run.validate_outputs();
    println!();
    if errors.is_empty() {
        println!("All outputs present.");
    } else {
        println!("Problems:");
        for error in &errors {
            println!("  - {error}");
        }
        anyhow::bail!("{} problem(s) found in {}", errors.len(), path.display());
    }

    Ok(())
}
