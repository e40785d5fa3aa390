//! Check external tool availability.

use followcam_common::config_file_path;
use followcam_render::command_exists;

pub fn run() -> anyhow::Result<()> {
    println!("FollowCam System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for (binary, purpose) in [("ffmpeg", "decoding and encoding"), ("ffprobe", "probing")] {
        if command_exists(binary) {
            println!("[OK] {binary} found ({purpose})");
        } else {
            println!("[MISSING] {binary} not found on PATH ({purpose})");
            all_ok = false;
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] No config at {} (using defaults)", config_path.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available. FollowCam is ready.");
    } else {
        println!("Install ffmpeg (which provides ffprobe) and retry.");
    }

    Ok(())
}
