//! # Setpoint sequencer
//!
//! Low-level setpoints only set the instant target, so they have to be resent continuously: when no setpoint is
//! received for a while the Crazyflie levels out and then cuts the motors. The sequencer sends one setpoint every
//! interval through three phases:
//!  - **Ramp**: `ramp_steps` setpoints at (0, 0, altitude * i / ramp_steps), where altitude is the z of the first
//!    waypoint
//!  - **Hold**: each waypoint sent `hold_repeats` times
//!  - **Stop**: one stop setpoint, followed by one interval so that it leaves before the link is closed
//!
//! Every setpoint updates the current [Target] read by the flight logger.
//!
//! The schedule does not depend on the link: a setpoint the vehicle fails to accept is logged and counted, and the
//! sequence carries on to the stop setpoint. Losing the link mid-flight therefore shows in the report and in the
//! flight log, not as an error.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::{Error, Result, SequenceTiming, Setpoint, Target, Vehicle};

/// Denominator of the legacy ramp target
const LEGACY_RAMP_DENOMINATOR: f32 = 25.0;

/// # Target logged during the takeoff ramp
///
/// The laboratory script logged (0, 0, i / 25) at ramp step `i` while commanding (0, 0, altitude * i / 10). For the
/// default 0.4 m takeoff both agree only at step 0. [RampTarget::Legacy] keeps the historical values so that new logs
/// compare with old ones; [RampTarget::Commanded] logs what is actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampTarget {
    /// (0, 0, i / 25)
    #[default]
    Legacy,
    /// The commanded ramp setpoint
    Commanded,
}

impl RampTarget {
    /// Target logged at ramp `step` out of `steps` towards `altitude`
    pub fn target(&self, step: u32, steps: u32, altitude: f32) -> Target {
        match self {
            RampTarget::Legacy => Target::new(0.0, 0.0, step as f32 / LEGACY_RAMP_DENOMINATOR),
            RampTarget::Commanded => Target::new(0.0, 0.0, ramp_altitude(step, steps, altitude)),
        }
    }
}

fn ramp_altitude(step: u32, steps: u32, altitude: f32) -> f32 {
    step as f32 / steps as f32 * altitude
}

/// What the sequencer sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceReport {
    /// Ramp setpoints issued
    pub ramp_setpoints: u32,
    /// Hold setpoints issued, all waypoints together
    pub hold_setpoints: u32,
    /// Setpoints, stop included, that the vehicle did not accept
    pub failed_setpoints: u32,
    /// True if the vehicle accepted the stop setpoint
    pub stopped: bool,
}

impl SequenceReport {
    fn record(&mut self, sent: Result<()>, what: &str) -> bool {
        match sent {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not send {}: {}", what, e);
                self.failed_setpoints += 1;
                false
            }
        }
    }
}

/// Fly the sequence
///
/// Publishes the current target on `target` before sleeping after each setpoint. Send errors do not interrupt the
/// schedule, see [SequenceReport::failed_setpoints]. Only an empty sequence is refused.
pub async fn run_sequence<V: Vehicle + ?Sized>(
    vehicle: &V,
    sequence: &[Setpoint],
    timing: &SequenceTiming,
    target: &watch::Sender<Target>,
) -> Result<SequenceReport> {
    let first = sequence
        .first()
        .ok_or_else(|| Error::InvalidConfig("cannot fly an empty sequence".into()))?;
    if first.x != 0.0 || first.y != 0.0 {
        warn!(
            "First waypoint is at ({}, {}), the takeoff ramp goes straight up from (0, 0)",
            first.x, first.y
        );
    }

    let interval = timing.interval();
    let mut report = SequenceReport::default();

    // Takeoff gently
    for step in 0..timing.ramp_steps {
        let z = ramp_altitude(step, timing.ramp_steps, first.z);
        let sent = vehicle.send_position_setpoint(0.0, 0.0, z, 0.0).await;
        report.record(sent, "ramp setpoint");
        target.send_replace(timing.ramp_target.target(step, timing.ramp_steps, first.z));
        report.ramp_setpoints += 1;
        sleep(interval).await;
    }

    for setpoint in sequence {
        info!("Setting position {:?}", setpoint);
        for _ in 0..timing.hold_repeats {
            let sent = vehicle
                .send_position_setpoint(setpoint.x, setpoint.y, setpoint.z, setpoint.yaw)
                .await;
            report.record(sent, "hold setpoint");
            target.send_replace(setpoint.target());
            report.hold_setpoints += 1;
            sleep(interval).await;
        }
    }

    let sent = vehicle.send_stop_setpoint().await;
    report.stopped = report.record(sent, "stop setpoint");
    // The stop setpoint must leave before the link is closed
    sleep(interval).await;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ramp_uses_twenty_fifths() {
        let targets: Vec<_> = (0..10)
            .map(|i| RampTarget::Legacy.target(i, 10, 0.4).z)
            .collect();
        assert_eq!(targets[0], 0.0);
        assert_eq!(targets[5], 0.2);
        assert_eq!(targets[9], 9.0 / 25.0);
    }

    #[test]
    fn commanded_ramp_matches_setpoint() {
        for step in 0..10 {
            assert_eq!(
                RampTarget::Commanded.target(step, 10, 0.4),
                Target::new(0.0, 0.0, ramp_altitude(step, 10, 0.4))
            );
        }
        assert_eq!(RampTarget::Commanded.target(5, 10, 0.4).z, 0.2);
    }

    #[test]
    fn ramp_never_reaches_altitude() {
        // The last ramp step is one step short, the first hold finishes the climb
        assert!(ramp_altitude(9, 10, 0.4) < 0.4);
    }
}
