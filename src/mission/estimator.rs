//! # Position estimator convergence
//!
//! After a reset, the Kalman estimator reports a large position variance that settles once the positioning system
//! gives a consistent fix. The mission waits for the variance of x, y and z to be stable before flying.
//!
//! Stability is judged on the trailing [WINDOW_SIZE] samples of each axis: the estimator has converged when, for
//! all three axes at once, the difference between the largest and smallest variance in the window is below the
//! threshold. The windows start filled with [SENTINEL_VARIANCE] so that convergence cannot be declared before a full
//! window of real samples has been seen. A variance at or above the sentinel means the estimator has no fix at all:
//! a window holding one is never stable, even if flat. The same goes for a NaN or infinite variance.

use std::collections::VecDeque;

use log::{debug, info, warn};
use tokio::time::sleep;

use crate::telemetry::{Subscription, TelemetrySample};
use crate::{EstimatorConfig, Error, Result, Vehicle};

/// Number of samples considered per axis
pub const WINDOW_SIZE: usize = 10;

/// Initial content of the windows
pub const SENTINEL_VARIANCE: f32 = 1000.0;

/// Variance variables, x, y and z
pub const VARIANCE_VARIABLES: [&str; 3] = ["kalman.varPX", "kalman.varPY", "kalman.varPZ"];

const RESET_PARAM: &str = "kalman.resetEstimation";

/// Position variance reported by the estimator at one sampling instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceSample {
    /// Variance of x
    pub x: f32,
    /// Variance of y
    pub y: f32,
    /// Variance of z
    pub z: f32,
}

impl VarianceSample {
    /// Create a sample
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Extract the variances from a telemetry sample, `None` if one is missing
    pub fn from_telemetry(sample: &TelemetrySample) -> Option<Self> {
        let [x, y, z] = VARIANCE_VARIABLES;
        Some(Self {
            x: sample.get(x)? as f32,
            y: sample.get(y)? as f32,
            z: sample.get(z)? as f32,
        })
    }
}

/// Fixed-length FIFO of the latest variances of one axis
#[derive(Debug, Clone)]
pub struct VarianceWindow {
    values: VecDeque<f32>,
}

impl VarianceWindow {
    /// A window of [WINDOW_SIZE] sentinel values
    pub fn new() -> Self {
        Self {
            values: std::iter::repeat(SENTINEL_VARIANCE).take(WINDOW_SIZE).collect(),
        }
    }

    /// Append a value, evicting the oldest
    pub fn push(&mut self, value: f32) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    /// Difference between the largest and the smallest value
    pub fn range(&self) -> f32 {
        let (min, max) = self.bounds();
        max - min
    }

    /// True if every value is finite and below the sentinel, and the range is below `threshold`
    pub fn is_stable(&self, threshold: f32) -> bool {
        if !self.values.iter().all(|v| v.is_finite()) {
            return false;
        }
        let (min, max) = self.bounds();
        max < SENTINEL_VARIANCE && max - min < threshold
    }

    fn bounds(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            })
    }

    /// Always [WINDOW_SIZE]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Never true, a window is always full
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for VarianceWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// # Convergence decision over the three axes
///
/// ```
/// # use crazyflie_waypoints::mission::estimator::{ConvergenceGate, VarianceSample};
/// let mut gate = ConvergenceGate::new(0.001);
///
/// // A perfectly stable estimator still needs a full window
/// for _ in 0..9 {
///     assert!(!gate.observe(VarianceSample::new(0.0001, 0.0001, 0.0001)));
/// }
/// assert!(gate.observe(VarianceSample::new(0.0001, 0.0001, 0.0001)));
/// ```
#[derive(Debug, Clone)]
pub struct ConvergenceGate {
    windows: [VarianceWindow; 3],
    threshold: f32,
    observed: usize,
}

impl ConvergenceGate {
    /// A gate with sentinel-filled windows
    pub fn new(threshold: f32) -> Self {
        Self {
            windows: Default::default(),
            threshold,
            observed: 0,
        }
    }

    /// Push one sample, returns true if the estimator is now converged
    pub fn observe(&mut self, sample: VarianceSample) -> bool {
        self.observed += 1;

        let [wx, wy, wz] = &mut self.windows;
        wx.push(sample.x);
        wy.push(sample.y);
        wz.push(sample.z);

        debug!("Variance ranges {:?}", self.ranges());

        self.windows.iter().all(|w| w.is_stable(self.threshold))
    }

    /// Current (max - min) range of x, y and z
    pub fn ranges(&self) -> [f32; 3] {
        let [wx, wy, wz] = &self.windows;
        [wx.range(), wy.range(), wz.range()]
    }

    /// Number of samples observed so far
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Consume samples until convergence
    ///
    /// Returns the number of samples observed. Samples missing one of the variance variables are skipped. Returns
    /// [Error::TelemetryClosed] if the subscription ends first.
    pub async fn wait(&mut self, subscription: &mut Subscription) -> Result<usize> {
        while let Some(sample) = subscription.next().await {
            match VarianceSample::from_telemetry(&sample) {
                Some(variance) => {
                    if self.observe(variance) {
                        return Ok(self.observed);
                    }
                }
                None => warn!("Variance sample at {} ms is incomplete, skipping", sample.timestamp),
            }
        }

        Err(Error::TelemetryClosed)
    }
}

/// Pulse `kalman.resetEstimation` to restart the estimator
pub async fn reset_estimator<V: Vehicle + ?Sized>(vehicle: &V, config: &EstimatorConfig) -> Result<()> {
    vehicle.set_param(RESET_PARAM, 1.0).await?;
    sleep(config.reset_delay()).await;
    vehicle.set_param(RESET_PARAM, 0.0).await?;
    Ok(())
}

/// Wait until the position estimator has converged
///
/// Subscribes to the variance variables and feeds a [ConvergenceGate] until it opens. Without a timeout in the
/// configuration this waits forever if the estimator never converges. The subscription is closed whatever the
/// outcome.
pub async fn wait_for_position_estimator<V: Vehicle + ?Sized>(
    vehicle: &V,
    config: &EstimatorConfig,
) -> Result<usize> {
    info!("Waiting for estimator to find position...");

    let mut subscription = vehicle.subscribe(&VARIANCE_VARIABLES, config.period()).await?;
    let mut gate = ConvergenceGate::new(config.threshold);

    let outcome = match config.timeout() {
        Some(deadline) => tokio::time::timeout(deadline, gate.wait(&mut subscription))
            .await
            .unwrap_or(Err(Error::EstimatorTimeout)),
        None => gate.wait(&mut subscription).await,
    };

    subscription.close().await;

    match &outcome {
        Ok(samples) => info!("Estimator converged after {} samples", samples),
        Err(e) => warn!("Estimator did not converge: {}", e),
    }

    outcome
}
