//! # Controller gains
//!
//! The Crazyflie position controller is a cascade of a position PID (`posCtlPid`) feeding a velocity PID
//! (`velCtlPid`). The firmware defaults are `xKp = yKp = zKp = 2.0`, `zKi = 0.5` and zero elsewhere; the mission adds
//! derivative action on position and raises the velocity gains.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::Vehicle;

/// A named float parameter of the gain table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    /// Parameter name, "group.name"
    pub name: String,
    /// Value to write
    pub value: f32,
}

impl Gain {
    /// Create a gain
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The gains written by the default mission
pub fn default_gains() -> Vec<Gain> {
    vec![
        // Position
        Gain::new("posCtlPid.xKp", 2.0),
        Gain::new("posCtlPid.xKd", 0.5),
        Gain::new("posCtlPid.yKp", 2.0),
        Gain::new("posCtlPid.yKd", 0.5),
        Gain::new("posCtlPid.zKp", 2.0),
        Gain::new("posCtlPid.zKd", 0.5),
        // Velocity
        Gain::new("velCtlPid.vxKp", 10.0),
        Gain::new("velCtlPid.vxKi", 1.0),
        Gain::new("velCtlPid.vyKp", 10.0),
        Gain::new("velCtlPid.vyKi", 1.0),
        Gain::new("velCtlPid.vzKp", 15.0),
        Gain::new("velCtlPid.vzKi", 15.0),
    ]
}

/// Write every gain, in order
///
/// Writes are fire-and-forget: a failed write is logged and the next one is still attempted, nothing is read back
/// and nothing is rolled back. Returns the number of writes the vehicle accepted.
pub async fn set_gains<V: Vehicle + ?Sized>(vehicle: &V, gains: &[Gain]) -> usize {
    let mut accepted = 0;

    for gain in gains {
        match vehicle.set_param(&gain.name, gain.value).await {
            Ok(()) => accepted += 1,
            Err(e) => warn!("Could not set {} to {}: {}", gain.name, gain.value, e),
        }
    }

    info!("{} of {} gains written", accepted, gains.len());
    accepted
}
