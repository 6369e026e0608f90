// Scans for a single Crazyflie, flies the waypoint mission and saves the flight log.
//
// Usage: fly [config.json]
//
// Without argument the built-in laboratory mission is flown.

use crazyflie_waypoints::radio::CrazyflieDiscovery;
use crazyflie_waypoints::{mission, MissionConfig};
use log::info;

const TOC_CACHE_DIR: &str = "./cache";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading mission from {}", path);
            MissionConfig::from_json_file(path)?
        }
        None => MissionConfig::default(),
    };

    let discovery = CrazyflieDiscovery::new(TOC_CACHE_DIR);
    let log = mission::run_mission(&discovery, &config).await?;

    log.save(&config.logging.output)?;
    println!("Log saved to {}", config.logging.output.display());

    Ok(())
}
