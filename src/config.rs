use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mission::gains::{default_gains, Gain};
use crate::mission::sequencer::RampTarget;
use crate::{Error, Result, Setpoint};

/// # Mission configuration
///
/// The default value is the laboratory mission: a 0.4 m takeoff followed by three waypoints on a 0.5 m square and
/// a descent to 0.1 m. Any field can be overridden from a JSON file with [MissionConfig::from_json_file()], missing
/// fields keep their default.
///
/// ```
/// # use crazyflie_waypoints::MissionConfig;
/// let config: MissionConfig = serde_json::from_str(r#"{
///     "sequence": [[0.0, 0.0, 0.3, 0.0], [0.3, 0.0, 0.3, 0.0]]
/// }"#).unwrap();
/// assert_eq!(config.sequence.len(), 2);
/// assert_eq!(config.timing.hold_repeats, 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissionConfig {
    /// Waypoints, `[x, y, z, yaw]`. The first one should be at x = 0, y = 0.
    pub sequence: Vec<Setpoint>,
    /// PID gains written before flying, in order
    pub gains: Vec<Gain>,
    /// Estimator reset and convergence
    pub estimator: EstimatorConfig,
    /// Setpoint cadence
    pub timing: SequenceTiming,
    /// Flight logging
    pub logging: LoggingConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            sequence: vec![
                Setpoint::new(0.0, 0.0, 0.4, 0.0),
                Setpoint::new(0.5, 0.0, 0.4, 0.0),
                Setpoint::new(0.5, 0.5, 0.4, 0.0),
                Setpoint::new(0.5, 0.5, 0.1, 0.0),
            ],
            gains: default_gains(),
            estimator: EstimatorConfig::default(),
            timing: SequenceTiming::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MissionConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: MissionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.sequence.is_empty() {
            return Err(invalid("sequence must contain at least one setpoint"));
        }
        if let Some(i) = self.sequence.iter().position(|s| !s.is_finite()) {
            return Err(invalid(format!("sequence[{}] is not finite", i)));
        }
        if let Some(gain) = self
            .gains
            .iter()
            .find(|g| g.name.is_empty() || !g.value.is_finite())
        {
            return Err(invalid(format!("gain {:?} is invalid", gain.name)));
        }
        self.estimator.validate()?;
        self.timing.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Estimator reset and convergence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Largest (max - min) variance range over the window considered converged
    pub threshold: f32,
    /// Variance sampling period in milliseconds
    pub period_ms: u64,
    /// Give up after this many seconds. `None` waits forever.
    pub timeout_secs: Option<f64>,
    /// Time between raising and lowering `kalman.resetEstimation`, in milliseconds
    pub reset_delay_ms: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            period_ms: 100,
            timeout_secs: None,
            reset_delay_ms: 100,
        }
    }
}

impl EstimatorConfig {
    /// Variance sampling period
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Convergence deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    /// Reset pulse length
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(invalid("estimator.threshold must be positive"));
        }
        if self.period_ms == 0 {
            return Err(invalid("estimator.period_ms must be positive"));
        }
        if let Some(timeout) = self.timeout_secs {
            if !(timeout.is_finite() && timeout > 0.0) {
                return Err(invalid("estimator.timeout_secs must be positive"));
            }
        }
        Ok(())
    }
}

/// Setpoint cadence of the sequencer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceTiming {
    /// Time between two setpoints, in milliseconds
    pub interval_ms: u64,
    /// Number of takeoff ramp steps
    pub ramp_steps: u32,
    /// Number of times each waypoint is sent
    pub hold_repeats: u32,
    /// Target logged during the takeoff ramp
    pub ramp_target: RampTarget,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            ramp_steps: 10,
            hold_repeats: 50,
            ramp_target: RampTarget::Legacy,
        }
    }
}

impl SequenceTiming {
    /// Time between two setpoints
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(invalid("timing.interval_ms must be positive"));
        }
        if self.ramp_steps == 0 {
            return Err(invalid("timing.ramp_steps must be positive"));
        }
        if self.hold_repeats == 0 {
            return Err(invalid("timing.hold_repeats must be positive"));
        }
        Ok(())
    }
}

/// Flight logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Position sampling period in milliseconds
    pub period_ms: u64,
    /// File the flight log is saved to
    pub output: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            period_ms: 10,
            output: PathBuf::from("lab8_log.npy"),
        }
    }
}

impl LoggingConfig {
    /// Position sampling period
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(invalid("logging.period_ms must be positive"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(invalid("logging.output must not be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig(reason.into())
}
