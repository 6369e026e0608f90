//! # Flight-control SDK interface
//!
//! The mission talks to the Crazyflie only through the [Vehicle] and [Discovery] traits. All methods take `&self`
//! so that a vehicle can be shared between the control task and the telemetry tasks.

use std::time::Duration;

use async_trait::async_trait;
use log::info;

use crate::telemetry::Subscription;
use crate::{Error, Result};

/// A connected vehicle
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Write a parameter
    ///
    /// The mission treats parameter writes as fire-and-forget: an error is reported but nothing is read back.
    async fn set_param(&self, name: &str, value: f32) -> Result<()>;

    /// Subscribe to a set of telemetry variables sampled every `period`
    async fn subscribe(&self, variables: &[&str], period: Duration) -> Result<Subscription>;

    /// Send an absolute position setpoint (meters, yaw in degrees)
    async fn send_position_setpoint(&self, x: f32, y: f32, z: f32, yaw: f32) -> Result<()>;

    /// Send the stop setpoint, cutting the motors
    async fn send_stop_setpoint(&self) -> Result<()>;

    /// Close the connection
    ///
    /// Once this function returns the vehicle is fully disconnected. Calling it twice is harmless.
    async fn disconnect(&self);
}

/// Link discovery
#[async_trait]
pub trait Discovery: Sync {
    /// Vehicle type produced by [Discovery::connect()]
    type Vehicle: Vehicle;

    /// Scan for reachable vehicles and return their URIs
    async fn scan(&self) -> Result<Vec<String>>;

    /// Connect to the vehicle at `uri`
    async fn connect(&self, uri: &str) -> Result<Self::Vehicle>;
}

/// Scan and return the URI of the only vehicle found
///
/// Finding no vehicle or more than one is an error: the mission is written for exactly one Crazyflie in range.
pub async fn find_single<D: Discovery + ?Sized>(discovery: &D) -> Result<String> {
    info!("Scanning interfaces for Crazyflies...");
    let mut found = discovery.scan().await?;

    match found.len() {
        0 => Err(Error::NoVehicleFound),
        1 => {
            let uri = found.remove(0);
            info!("Crazyflie found at {}", uri);
            Ok(uri)
        }
        _ => Err(Error::MultipleVehiclesFound(found)),
    }
}
