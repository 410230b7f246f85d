//! # URRI Volume
//!
//! Presents a URRI network receiver's volume as a dimmable light:
//! brightness is the volume, and on/off is unmuted/muted.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use urri_volume::{
//!     AccessoryAdapter, AccessoryConfig, AccessoryError, Characteristic, CharacteristicValue,
//!     VolumeAccessory,
//! };
//!
//! struct PrintAdapter;
//!
//! impl AccessoryAdapter for PrintAdapter {
//!     fn update_characteristic(
//!         &self,
//!         characteristic: Characteristic,
//!         value: Result<CharacteristicValue, AccessoryError>,
//!     ) {
//!         println!("{characteristic}: {value:?}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AccessoryConfig::new("Living Room").with_address("192.168.1.40");
//!     let adapter = Arc::new(PrintAdapter);
//!     let accessory = VolumeAccessory::connect(config, adapter)?;
//!
//!     accessory.set_on(true).await?;              // default-on volume
//!     accessory.set_brightness(35).await?;        // volume 35
//!     println!("on: {}", accessory.get_on().await);
//!
//!     accessory.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! framework write ─► SyncEngine ─► Transport ─► receiver
//!                       │   ▲
//!                       ▼   │ responses
//!                   VolumeCache ─► AccessoryAdapter (deferred push)
//!                       ▲
//!                     Poller (every refreshInterval)
//! ```

pub mod accessory;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod poller;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::sync::Arc;

use receiver_client::{ReceiverClient, Transport};
use tracing::info;

pub use accessory::{
    AccessoryAdapter, AccessoryInformation, Characteristic, CharacteristicValue,
    LightbulbService, WriteRequest,
};
pub use config::{AccessoryConfig, ConfigError};
pub use engine::{PowerIntent, SyncEngine};
pub use error::{AccessoryError, Result};
pub use poller::Poller;
pub use state::{Volume, VolumeState};

pub use receiver_client;

/// One receiver exposed as a lightbulb accessory
///
/// Owns the cache, the engine, and the single poll task. The poll task is
/// cancelled by [`VolumeAccessory::shutdown`] or when the accessory is dropped.
pub struct VolumeAccessory {
    config: AccessoryConfig,
    engine: Arc<SyncEngine>,
    poller: Poller,
}

impl VolumeAccessory {
    /// Build the accessory over an existing transport and start polling
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: AccessoryConfig,
        transport: Arc<dyn Transport>,
        adapter: Arc<dyn AccessoryAdapter>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let engine = Arc::new(SyncEngine::new(
            transport,
            adapter,
            config.default_on_volume(),
        ));
        let poller = Poller::start(Arc::clone(&engine), config.refresh_interval_duration());

        info!(name = %config.name, "volume accessory created");
        info!(
            name = %config.name,
            default_volume = config.default_volume,
            address = %config.address,
            "accessory configuration"
        );

        Ok(Self {
            config,
            engine,
            poller,
        })
    }

    /// Build the accessory with an HTTP client for `config.address`
    pub fn connect(
        config: AccessoryConfig,
        adapter: Arc<dyn AccessoryAdapter>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut client = ReceiverClient::new(&config.address);
        if let Some(timeout) = config.request_timeout_duration() {
            client = client.with_timeout(timeout);
        }
        Self::new(config, Arc::new(client), adapter)
    }

    pub fn config(&self) -> &AccessoryConfig {
        &self.config
    }

    pub fn information(&self) -> AccessoryInformation {
        AccessoryInformation::new(&self.config.name)
    }

    pub fn lightbulb(&self) -> LightbulbService {
        LightbulbService::new(&self.config.name)
    }

    pub fn state(&self) -> VolumeState {
        self.engine.state()
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub async fn get_on(&self) -> bool {
        self.engine.get_on().await
    }

    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.engine.set_on(on).await
    }

    pub fn get_brightness(&self) -> u8 {
        self.engine.get_brightness()
    }

    pub async fn set_brightness(&self, value: u8) -> Result<()> {
        self.engine.set_brightness(value).await
    }

    pub async fn handle_write(&self, request: WriteRequest) -> Result<()> {
        self.engine.handle_write(request).await
    }

    /// Poll now instead of waiting for the next interval
    pub fn refresh(&self) {
        self.poller.poll_now();
    }

    /// Stop polling and wait for the poll task to end
    pub async fn shutdown(self) -> Result<()> {
        info!(name = %self.config.name, "shutting down volume accessory");
        self.poller.shutdown().await
    }
}
