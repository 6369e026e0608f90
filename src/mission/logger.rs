//! # Flight logger
//!
//! Records the estimated position together with the target the sequencer is currently flying to. The target is
//! read from the [watch] channel the sequencer publishes on, so every record carries the latest complete target
//! at the time the telemetry was delivered.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;

use crate::telemetry::{CallbackSubscription, TelemetrySample};
use crate::{FlightLog, LogRecord, Result, Target, Vehicle};

/// Position variables, x, y and z
pub const POSITION_VARIABLES: [&str; 3] = ["kalman.stateX", "kalman.stateY", "kalman.stateZ"];

/// # Running flight log
///
/// Created with [FlightLogger::start()], ended with [FlightLogger::finish()]. Dropping the logger unsubscribes too,
/// discarding the records.
#[derive(Debug)]
pub struct FlightLogger {
    subscription: CallbackSubscription,
    log: Arc<Mutex<FlightLog>>,
}

impl FlightLogger {
    /// Subscribe to the position variables and start recording
    pub async fn start<V: Vehicle + ?Sized>(
        vehicle: &V,
        period: Duration,
        target: watch::Receiver<Target>,
    ) -> Result<Self> {
        let subscription = vehicle.subscribe(&POSITION_VARIABLES, period).await?;
        let log = Arc::new(Mutex::new(FlightLog::new()));

        let callback_log = log.clone();
        let subscription = subscription.on_sample(move |sample| {
            let current = *target.borrow();
            if let Some(record) = record(&sample, current) {
                debug!("pos: ({}, {}, {})", record.x, record.y, record.z);
                callback_log
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(record);
            }
        });

        info!("Position logging started");

        Ok(Self { subscription, log })
    }

    /// Number of records so far
    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unsubscribe and return the log
    ///
    /// Samples delivered before the unsubscription are all recorded.
    pub async fn finish(self) -> FlightLog {
        let FlightLogger { subscription, log } = self;
        subscription.close().await;

        let log = std::mem::take(&mut *log.lock().unwrap_or_else(PoisonError::into_inner));
        info!("Position logging stopped, {} records", log.len());
        log
    }
}

fn record(sample: &TelemetrySample, target: Target) -> Option<LogRecord> {
    let [x, y, z] = POSITION_VARIABLES;
    Some(LogRecord {
        timestamp: sample.timestamp as f64,
        x: sample.get(x)?,
        y: sample.get(y)?,
        z: sample.get(z)?,
        target_x: target.x as f64,
        target_y: target.y as f64,
        target_z: target.z as f64,
    })
}
