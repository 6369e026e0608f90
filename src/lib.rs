//! # Crazyflie waypoint flight
//!
//! This crate flies a Crazyflie through a sequence of absolute position setpoints and logs the estimated position
//! against the commanded target so that the flight can be plotted afterwards. Flight control, state estimation and
//! the radio protocol stay in the Crazyflie firmware and in the [crazyflie-lib] crate: this crate only decides *when*
//! to fly and *what* to send.
//!
//! ## Mission
//!
//! A mission runs these steps, in order:
//!
//! | Step | Module |
//! |------|--------|
//! | Find exactly one Crazyflie and connect | [vehicle] |
//! | Reset the Kalman estimator and wait for the position variance to settle | [mission::estimator] |
//! | Write the position and velocity PID gains | [mission::gains] |
//! | Start logging position and current target | [mission::logger] |
//! | Take off on a ramp, hold each waypoint, stop | [mission::sequencer] |
//! | Disconnect and persist the log as a `.npy` array | [flight_log] |
//!
//! The [plot] module renders a persisted log as PNG figures.
//!
//! ## Vehicles
//!
//! The mission is written against the [Vehicle] trait. Two implementations are provided:
//!  - `radio::CrazyflieVehicle`, a real Crazyflie through [crazyflie-lib] (cargo feature `radio`)
//!  - [sim::SimVehicle], an in-process vehicle that records every command and plays scripted telemetry
//!
//! For example, flying the default mission against the simulated vehicle:
//! ``` no_run
//! # async fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use crazyflie_waypoints::{mission, sim::SimDiscovery, MissionConfig};
//!
//! let config = MissionConfig::default();
//! let discovery = SimDiscovery::single(Default::default());
//!
//! let log = mission::run_mission(&discovery, &config).await?;
//! log.save(&config.logging.output)?;
//! # Ok(())
//! # }
//! ```
//!
//! [crazyflie-lib]: https://github.com/bitcraze/crazyflie-lib-rs

#![warn(missing_docs)]

mod config;
mod error;
mod setpoint;

pub mod flight_log;
pub mod mission;
pub mod plot;
#[cfg(feature = "radio")]
pub mod radio;
pub mod sim;
pub mod telemetry;
pub mod vehicle;

pub use crate::config::{EstimatorConfig, LoggingConfig, MissionConfig, SequenceTiming};
pub use crate::error::{Error, Result};
pub use crate::flight_log::{FlightLog, LogRecord};
pub use crate::mission::gains::Gain;
pub use crate::mission::sequencer::RampTarget;
pub use crate::setpoint::{Setpoint, Target};
pub use crate::vehicle::{Discovery, Vehicle};
