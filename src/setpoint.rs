use serde::{Deserialize, Serialize};

/// # Absolute position setpoint
///
/// Position in meters in the world frame and yaw in degrees, as sent by
/// [Vehicle::send_position_setpoint()](crate::Vehicle::send_position_setpoint).
///
/// In configuration files a setpoint is written as a `[x, y, z, yaw]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Setpoint {
    /// Target x position (meters)
    pub x: f32,
    /// Target y position (meters)
    pub y: f32,
    /// Target z position (meters)
    pub z: f32,
    /// Target yaw angle (degrees, absolute)
    pub yaw: f32,
}

impl Setpoint {
    /// Create a setpoint
    pub const fn new(x: f32, y: f32, z: f32, yaw: f32) -> Self {
        Self { x, y, z, yaw }
    }

    /// The position part of the setpoint, as logged next to the estimated position
    pub fn target(&self) -> Target {
        Target::new(self.x, self.y, self.z)
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.yaw.is_finite()
    }
}

impl From<[f32; 4]> for Setpoint {
    fn from([x, y, z, yaw]: [f32; 4]) -> Self {
        Self { x, y, z, yaw }
    }
}

impl From<Setpoint> for [f32; 4] {
    fn from(setpoint: Setpoint) -> Self {
        [setpoint.x, setpoint.y, setpoint.z, setpoint.yaw]
    }
}

/// Position the vehicle is currently asked to reach
///
/// This is what the flight logger stamps on each record. It is published by the
/// sequencer through a [tokio::sync::watch] channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Target {
    /// Target x position (meters)
    pub x: f32,
    /// Target y position (meters)
    pub y: f32,
    /// Target z position (meters)
    pub z: f32,
}

impl Target {
    /// Create a target
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
