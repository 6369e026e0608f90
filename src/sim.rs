//! # Simulated vehicle
//!
//! [SimVehicle] implements [Vehicle] without any radio. It records every parameter write and every setpoint, and
//! serves telemetry from a simple model:
//!  - `kalman.varPX/varPY/varPZ` play a scripted list of [VarianceSample], either once with the last entry
//!    repeating forever or in a loop
//!  - `kalman.stateX/stateY/stateZ` report the last commanded position, and zero after a stop setpoint
//!
//! Time is taken from the tokio clock so that tests can run with a paused clock.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use crazyflie_waypoints::sim::{Command, SimVehicle};
//! use crazyflie_waypoints::{Setpoint, Vehicle};
//!
//! let vehicle = SimVehicle::new();
//! vehicle.send_position_setpoint(0.0, 0.0, 0.2, 0.0).await.unwrap();
//! vehicle.send_stop_setpoint().await.unwrap();
//!
//! assert_eq!(
//!     vehicle.commands(),
//!     vec![Command::Position(Setpoint::new(0.0, 0.0, 0.2, 0.0)), Command::Stop]
//! );
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time::Instant;

use crate::mission::estimator::{VarianceSample, VARIANCE_VARIABLES};
use crate::mission::logger::POSITION_VARIABLES;
use crate::telemetry::{self, Subscription, TelemetrySample};
use crate::{Discovery, Error, Result, Setpoint, Vehicle};

/// URI of the simulated vehicle
pub const SIM_URI: &str = "sim://0";

/// A command received by the simulated vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Position setpoint
    Position(Setpoint),
    /// Stop setpoint
    Stop,
}

/// # In-process vehicle
///
/// Cloning gives another handle to the same vehicle, which is how tests keep an eye on what the mission sends.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    state: Arc<SimState>,
}

#[derive(Debug)]
struct SimState {
    start: Instant,
    connected: AtomicBool,
    variance: Mutex<Vec<VarianceSample>>,
    variance_loops: AtomicBool,
    link_budget: Mutex<Option<usize>>,
    commands: Mutex<Vec<Command>>,
    params: Mutex<Vec<(String, f32)>>,
    delivered: Mutex<HashMap<String, usize>>,
    active_subscriptions: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Variance settling after five samples
fn converging_variance() -> Vec<VarianceSample> {
    [0.1, 0.05, 0.02, 0.01, 0.005, 0.0001]
        .iter()
        .map(|&v| VarianceSample::new(v, v, v))
        .collect()
}

impl SimVehicle {
    /// A connected vehicle whose estimator converges after a few samples
    pub fn new() -> Self {
        Self {
            state: Arc::new(SimState {
                start: Instant::now(),
                connected: AtomicBool::new(true),
                variance: Mutex::new(converging_variance()),
                variance_loops: AtomicBool::new(false),
                link_budget: Mutex::new(None),
                commands: Mutex::new(Vec::new()),
                params: Mutex::new(Vec::new()),
                delivered: Mutex::new(HashMap::new()),
                active_subscriptions: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the variance script
    ///
    /// Each variance subscription plays the script from the start; the last sample repeats forever. An empty script
    /// is replaced by a single sample of [SENTINEL_VARIANCE](crate::mission::estimator::SENTINEL_VARIANCE).
    pub fn with_variance(self, mut script: Vec<VarianceSample>) -> Self {
        if script.is_empty() {
            let v = crate::mission::estimator::SENTINEL_VARIANCE;
            script.push(VarianceSample::new(v, v, v));
        }
        *lock(&self.state.variance) = script;
        self.state.variance_loops.store(false, Relaxed);
        self
    }

    /// Replace the variance script with one played in a loop
    ///
    /// A script of two or more different samples never lets the estimator converge.
    pub fn with_variance_loop(self, script: Vec<VarianceSample>) -> Self {
        let vehicle = self.with_variance(script);
        vehicle.state.variance_loops.store(true, Relaxed);
        vehicle
    }

    /// Lose the link after `transmissions` successful parameter writes and setpoints
    pub fn with_link_budget(self, transmissions: usize) -> Self {
        *lock(&self.state.link_budget) = Some(transmissions);
        self
    }

    /// Drop the link now
    pub fn lose_link(&self) {
        self.state.connected.store(false, Relaxed);
    }

    /// True until the link is lost or the vehicle disconnected
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Relaxed)
    }

    /// Setpoints received, in order
    pub fn commands(&self) -> Vec<Command> {
        lock(&self.state.commands).clone()
    }

    /// Parameter writes received, in order
    pub fn params(&self) -> Vec<(String, f32)> {
        lock(&self.state.params).clone()
    }

    /// Number of samples containing `variable` delivered to subscribers
    pub fn delivered(&self, variable: &str) -> usize {
        lock(&self.state.delivered).get(variable).copied().unwrap_or(0)
    }

    /// Subscriptions whose vehicle side is still running
    pub fn active_subscriptions(&self) -> usize {
        self.state.active_subscriptions.load(Relaxed)
    }
}

impl Default for SimVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl SimState {
    fn transmit(&self) -> Result<()> {
        if !self.connected.load(Relaxed) {
            return Err(Error::Disconnected);
        }

        let mut budget = lock(&self.link_budget);
        match *budget {
            Some(0) => {
                debug!("Simulated link lost");
                self.connected.store(false, Relaxed);
                Err(Error::Disconnected)
            }
            Some(ref mut remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn position(&self) -> [f32; 3] {
        match lock(&self.commands).last() {
            Some(Command::Position(setpoint)) => [setpoint.x, setpoint.y, setpoint.z],
            Some(Command::Stop) | None => [0.0; 3],
        }
    }

    fn variance(&self, index: usize) -> VarianceSample {
        let script = lock(&self.variance);
        if self.variance_loops.load(Relaxed) {
            script[index % script.len()]
        } else {
            script[index.min(script.len() - 1)]
        }
    }

    fn sample(&self, variables: &[String], index: usize) -> TelemetrySample {
        let position = self.position();
        let variance = self.variance(index);

        let values = variables
            .iter()
            .map(|name| {
                let value = match name.as_str() {
                    "kalman.varPX" => variance.x,
                    "kalman.varPY" => variance.y,
                    "kalman.varPZ" => variance.z,
                    "kalman.stateX" => position[0],
                    "kalman.stateY" => position[1],
                    _ => position[2],
                };
                (name.clone(), value as f64)
            })
            .collect();

        TelemetrySample {
            timestamp: self.start.elapsed().as_millis() as u32,
            values,
        }
    }

    fn count_delivery(&self, variables: &[String]) {
        let mut delivered = lock(&self.delivered);
        for name in variables {
            *delivered.entry(name.clone()).or_default() += 1;
        }
    }
}

/// Keeps [SimVehicle::active_subscriptions()] up to date for the lifetime of a pump
struct ActiveSubscription(Arc<SimState>);

impl ActiveSubscription {
    fn new(state: Arc<SimState>) -> Self {
        state.active_subscriptions.fetch_add(1, Relaxed);
        Self(state)
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.0.active_subscriptions.fetch_sub(1, Relaxed);
    }
}

#[async_trait]
impl Vehicle for SimVehicle {
    async fn set_param(&self, name: &str, value: f32) -> Result<()> {
        self.state.transmit()?;
        lock(&self.state.params).push((name.to_owned(), value));
        Ok(())
    }

    async fn subscribe(&self, variables: &[&str], period: Duration) -> Result<Subscription> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        if let Some(unknown) = variables
            .iter()
            .find(|v| !VARIANCE_VARIABLES.contains(*v) && !POSITION_VARIABLES.contains(*v))
        {
            return Err(Error::Sdk(format!("Log variable {} not found", unknown)));
        }

        let variables: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
        let active = ActiveSubscription::new(self.state.clone());

        Ok(telemetry::subscription(move |publisher| async move {
            let state = active.0.clone();
            let mut ticker = tokio::time::interval(period);
            let mut index = 0;

            loop {
                tokio::select! {
                    _ = publisher.stopped() => break,
                    _ = ticker.tick() => {
                        if !state.connected.load(Relaxed) {
                            break;
                        }
                        let sample = state.sample(&variables, index);
                        index += 1;
                        if !publisher.publish(sample).await {
                            break;
                        }
                        state.count_delivery(&variables);
                    }
                }
            }

            drop(active);
        }))
    }

    async fn send_position_setpoint(&self, x: f32, y: f32, z: f32, yaw: f32) -> Result<()> {
        self.state.transmit()?;
        lock(&self.state.commands).push(Command::Position(Setpoint::new(x, y, z, yaw)));
        Ok(())
    }

    async fn send_stop_setpoint(&self) -> Result<()> {
        self.state.transmit()?;
        lock(&self.state.commands).push(Command::Stop);
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.connected.store(false, Relaxed);
    }
}

/// Discovery returning a fixed list of URIs, all connecting to the same [SimVehicle]
#[derive(Debug, Clone)]
pub struct SimDiscovery {
    uris: Vec<String>,
    vehicle: SimVehicle,
}

impl SimDiscovery {
    /// One vehicle in range, at [SIM_URI]
    pub fn single(vehicle: SimVehicle) -> Self {
        Self::with_uris(vec![SIM_URI.to_owned()], vehicle)
    }

    /// Scanning returns `uris`, connecting to any of them gives `vehicle`
    pub fn with_uris(uris: Vec<String>, vehicle: SimVehicle) -> Self {
        Self { uris, vehicle }
    }
}

#[async_trait]
impl Discovery for SimDiscovery {
    type Vehicle = SimVehicle;

    async fn scan(&self) -> Result<Vec<String>> {
        Ok(self.uris.clone())
    }

    async fn connect(&self, uri: &str) -> Result<SimVehicle> {
        if self.uris.iter().any(|u| u == uri) {
            Ok(self.vehicle.clone())
        } else {
            Err(Error::Sdk(format!("No vehicle at {}", uri)))
        }
    }
}
