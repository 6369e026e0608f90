//! # Telemetry subscriptions
//!
//! A subscription delivers time-stamped samples of a set of named variables at a fixed period. It can be consumed
//! in two ways:
//!  - pulled one sample at a time with [Subscription::next()], like iterating a blocking logger
//!  - pushed to a callback with [Subscription::on_sample()], running on its own task
//!
//! Vehicles implement subscriptions with [subscription()]: the pump future they provide runs on a tokio task and
//! publishes samples through a [Publisher] until the subscriber goes away. Closing or dropping the subscription is
//! observed by the pump through [Publisher::stopped()], which is where the vehicle unsubscribes. This holds on every
//! exit path, including early returns with `?` and panics unwinding through the subscriber.

use std::collections::HashMap;
use std::future::Future;

use flume as channel;
use log::debug;
use tokio::task::JoinHandle;

/// One telemetry delivery
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Vehicle timestamp in milliseconds
    pub timestamp: u32,
    /// Values by variable name ("group.name")
    pub values: HashMap<String, f64>,
}

impl TelemetrySample {
    /// Value of a variable, if present in this sample
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Vehicle side of a subscription
///
/// Handed to the pump future given to [subscription()].
#[derive(Debug)]
pub struct Publisher {
    samples: channel::Sender<TelemetrySample>,
    stop: channel::Receiver<()>,
}

impl Publisher {
    /// Send one sample to the subscriber
    ///
    /// Returns `false` if the subscriber is gone, in which case the pump should return.
    pub async fn publish(&self, sample: TelemetrySample) -> bool {
        self.samples.send_async(sample).await.is_ok()
    }

    /// Resolves once the subscriber has closed or dropped the subscription
    pub async fn stopped(&self) {
        // Nothing is ever sent on this channel, only the sender drop wakes us up
        let _ = self.stop.recv_async().await;
    }
}

/// Create a subscription fed by `pump`
///
/// The pump is spawned on the tokio runtime and receives the [Publisher] end of the subscription. It is expected to
/// publish samples until [Publisher::stopped()] resolves or [Publisher::publish()] returns `false`, then release
/// whatever the vehicle needs released before returning. [Subscription::close()] waits for the pump to return.
pub fn subscription<F, Fut>(pump: F) -> Subscription
where
    F: FnOnce(Publisher) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (samples_tx, samples) = channel::unbounded();
    let (stop, stop_rx) = channel::bounded(1);

    let publisher = Publisher {
        samples: samples_tx,
        stop: stop_rx,
    };
    let pump = tokio::spawn(pump(publisher));

    Subscription {
        samples,
        stop,
        pump,
    }
}

/// # Subscriber side of a telemetry subscription
///
/// See the [telemetry module documentation](crate::telemetry) for more context and information.
#[derive(Debug)]
pub struct Subscription {
    samples: channel::Receiver<TelemetrySample>,
    stop: channel::Sender<()>,
    pump: JoinHandle<()>,
}

impl Subscription {
    /// Wait for the next sample
    ///
    /// Returns `None` once the vehicle side has ended the subscription and every delivered sample has been read.
    pub async fn next(&mut self) -> Option<TelemetrySample> {
        self.samples.recv_async().await.ok()
    }

    /// Unsubscribe and wait for the vehicle side to be released
    pub async fn close(self) {
        let Subscription { samples, stop, pump } = self;
        drop(stop);
        // Dropping the samples receiver unblocks a pump waiting on a full channel
        drop(samples);
        if let Err(e) = pump.await {
            debug!("Telemetry pump ended abnormally: {}", e);
        }
    }

    /// Deliver every sample to `callback` from a dedicated task
    ///
    /// The callback is called in delivery order. The returned handle owns the subscription: closing or dropping it
    /// unsubscribes.
    pub fn on_sample<F>(self, mut callback: F) -> CallbackSubscription
    where
        F: FnMut(TelemetrySample) + Send + 'static,
    {
        let Subscription { samples, stop, pump } = self;

        let consumer = tokio::spawn(async move {
            while let Ok(sample) = samples.recv_async().await {
                callback(sample);
            }
        });

        CallbackSubscription {
            stop,
            pump,
            consumer,
        }
    }
}

/// A subscription delivering to a callback, see [Subscription::on_sample()]
#[derive(Debug)]
pub struct CallbackSubscription {
    stop: channel::Sender<()>,
    pump: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

impl CallbackSubscription {
    /// Unsubscribe and wait until every sample already delivered has been passed to the callback
    pub async fn close(self) {
        let CallbackSubscription {
            stop,
            pump,
            consumer,
        } = self;
        drop(stop);
        if let Err(e) = pump.await {
            debug!("Telemetry pump ended abnormally: {}", e);
        }
        // The pump dropped its sender, the consumer drains what is left and returns
        if let Err(e) = consumer.await {
            debug!("Telemetry callback ended abnormally: {}", e);
        }
    }
}
