//! # Crazyflie over the radio
//!
//! [Vehicle] and [Discovery] implemented with [crazyflie-lib](crazyflie_lib). Enabled by the `radio` cargo feature.
//!
//! Log and param tables of content are cached as files in a directory so that reconnecting to the same firmware
//! skips the TOC download.

use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use crazyflie_lib::subsystems::log::LogPeriod;
use crazyflie_lib::{Crazyflie, TocCache};
use crazyflie_link::LinkContext;
use log::{debug, warn};

use crate::telemetry::{self, Subscription, TelemetrySample};
use crate::{Discovery, Result, Vehicle};

/// Default radio address scanned for Crazyflies
pub const DEFAULT_ADDRESS: [u8; 5] = [0xE7; 5];

/// # TOC cache stored as one file per TOC checksum
#[derive(Debug, Clone)]
pub struct DirTocCache {
    dir: PathBuf,
}

impl DirTocCache {
    /// Cache in `dir`, created on first store
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, crc32: u32) -> PathBuf {
        self.dir.join(format!("{:08X}.json", crc32))
    }
}

impl TocCache for DirTocCache {
    fn get_toc(&self, crc32: u32) -> Option<String> {
        std::fs::read_to_string(self.path(crc32)).ok()
    }

    fn store_toc(&self, crc32: u32, toc: &str) {
        let stored = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(self.path(crc32), toc));
        if let Err(e) = stored {
            warn!("Could not cache TOC {:08X} in {}: {}", crc32, self.dir.display(), e);
        }
    }
}

/// # Radio discovery
///
/// Scans [DEFAULT_ADDRESS] on all radio channels and connects with a [DirTocCache].
pub struct CrazyflieDiscovery {
    link_context: LinkContext,
    toc_cache: DirTocCache,
}

impl CrazyflieDiscovery {
    /// Discovery caching TOCs in `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            link_context: LinkContext::new(),
            toc_cache: DirTocCache::new(cache_dir),
        }
    }
}

#[async_trait]
impl Discovery for CrazyflieDiscovery {
    type Vehicle = CrazyflieVehicle;

    async fn scan(&self) -> Result<Vec<String>> {
        Ok(self.link_context.scan(DEFAULT_ADDRESS).await?)
    }

    async fn connect(&self, uri: &str) -> Result<CrazyflieVehicle> {
        let crazyflie = Crazyflie::connect_from_uri(&self.link_context, uri, self.toc_cache.clone()).await?;
        Ok(CrazyflieVehicle { crazyflie })
    }
}

/// A connected Crazyflie
pub struct CrazyflieVehicle {
    crazyflie: Crazyflie,
}

#[async_trait]
impl Vehicle for CrazyflieVehicle {
    async fn set_param(&self, name: &str, value: f32) -> Result<()> {
        self.crazyflie.param.set_lossy(name, value as f64).await?;
        Ok(())
    }

    async fn subscribe(&self, variables: &[&str], period: Duration) -> Result<Subscription> {
        let mut block = self.crazyflie.log.create_block().await?;
        for variable in variables {
            block.add_variable(variable).await?;
        }
        let stream = block.start(LogPeriod::try_from(period)?).await?;

        Ok(telemetry::subscription(move |publisher| async move {
            loop {
                tokio::select! {
                    _ = publisher.stopped() => break,
                    data = stream.next() => match data {
                        Ok(data) => {
                            let sample = TelemetrySample {
                                timestamp: data.timestamp,
                                values: data
                                    .data
                                    .iter()
                                    .map(|(name, value)| (name.clone(), value.to_f64_lossy()))
                                    .collect(),
                            };
                            if !publisher.publish(sample).await {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Log stream ended: {:?}", e);
                            break;
                        }
                    },
                }
            }

            // Frees the log block in the Crazyflie
            if let Err(e) = stream.stop().await {
                debug!("Could not stop log block: {:?}", e);
            }
        }))
    }

    async fn send_position_setpoint(&self, x: f32, y: f32, z: f32, yaw: f32) -> Result<()> {
        self.crazyflie.commander.setpoint_position(x, y, z, yaw).await?;
        Ok(())
    }

    async fn send_stop_setpoint(&self) -> Result<()> {
        self.crazyflie.commander.setpoint_stop().await?;
        Ok(())
    }

    async fn disconnect(&self) {
        self.crazyflie.disconnect().await;
    }
}
