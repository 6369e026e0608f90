//! # Waypoint mission
//!
//! [run_mission()] is the complete flight: discovery, estimator reset and convergence, gains, logging and the
//! setpoint sequence. The steps are also available one by one in the submodules.

pub mod estimator;
pub mod gains;
pub mod logger;
pub mod sequencer;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::vehicle::find_single;
use crate::{Discovery, FlightLog, MissionConfig, Result, Target, Vehicle};

use self::logger::FlightLogger;

/// Find the Crazyflie, fly the mission and disconnect
///
/// The vehicle is disconnected whatever the outcome. Errors before takeoff (discovery, estimator, logging setup)
/// end the mission without a log. Once the sequence has started the flight always runs to the end and its log is
/// returned, including when the link was lost on the way.
pub async fn run_mission<D: Discovery + ?Sized>(discovery: &D, config: &MissionConfig) -> Result<FlightLog> {
    config.validate()?;

    let uri = find_single(discovery).await?;
    let vehicle = discovery.connect(&uri).await?;
    info!("Connected to {}", uri);

    let outcome = fly(&vehicle, config).await;

    vehicle.disconnect().await;
    info!("Disconnected from {}", uri);

    outcome
}

/// Fly the mission on an already connected vehicle
pub async fn fly<V: Vehicle + ?Sized>(vehicle: &V, config: &MissionConfig) -> Result<FlightLog> {
    estimator::reset_estimator(vehicle, &config.estimator).await?;
    estimator::wait_for_position_estimator(vehicle, &config.estimator).await?;

    gains::set_gains(vehicle, &config.gains).await;

    let (target_tx, target_rx) = watch::channel(Target::default());
    let logger = FlightLogger::start(vehicle, config.logging.period(), target_rx).await?;

    let flown = sequencer::run_sequence(vehicle, &config.sequence, &config.timing, &target_tx).await;

    debug!("{} records logged when the sequence ended", logger.len());
    let log = logger.finish().await;

    let report = flown?;
    info!(
        "Sequence done: {} ramp and {} hold setpoints, {} records",
        report.ramp_setpoints,
        report.hold_setpoints,
        log.len()
    );
    if report.failed_setpoints > 0 {
        warn!(
            "{} setpoints were not accepted by the vehicle, stop {}",
            report.failed_setpoints,
            if report.stopped { "accepted" } else { "lost" }
        );
    }

    Ok(log)
}
