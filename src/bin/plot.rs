// Renders the position and trajectory figures of a saved flight log.
//
// Usage: plot [log.npy]
//
// Figures are written next to the log file.

use std::path::{Path, PathBuf};

use crazyflie_waypoints::{plot, LoggingConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let log_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| LoggingConfig::default().output);

    let output_dir = match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    let (position, trajectory) = plot::render_flight_log(&log_path, &output_dir)?;
    println!("Figures: {} {}", position.display(), trajectory.display());

    Ok(())
}
