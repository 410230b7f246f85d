//! Synchronization engine
//!
//! Reconciles the volume cache with the receiver and with framework writes.
//! Each handler issues at most one request; between awaits it runs to
//! completion, so its own cache read/write pair is atomic. Handlers do not
//! exclude each other: a poll and a set may be in flight together, and
//! whichever response lands last wins the cache.

use std::sync::Arc;
use std::time::Duration;

use receiver_client::Transport;
use tracing::{debug, info, warn};

use crate::accessory::{AccessoryAdapter, Characteristic, CharacteristicValue, WriteRequest};
use crate::error::{AccessoryError, Result};
use crate::state::{Volume, VolumeCache, VolumeState};

/// Deferral before pushing state after a successful write
///
/// The framework echoes a set value back as a get; pushing immediately races
/// that echo and makes the companion app UI flicker.
pub const UPDATE_DELAY: Duration = Duration::from_millis(100);

/// Brightness value that is silently ignored by [`SyncEngine::set_brightness`]
pub const IGNORED_BRIGHTNESS: u8 = 100;

/// Where a power write came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerIntent {
    /// Plain on/off toggle
    #[default]
    Toggle,
    /// Switch-on that accompanies a brightness change in the same write;
    /// the brightness already carries the volume
    Slider,
}

/// Read/write handlers and the poll body
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
    adapter: Arc<dyn AccessoryAdapter>,
    cache: Arc<VolumeCache>,
    update_delay: Duration,
}

impl SyncEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        adapter: Arc<dyn AccessoryAdapter>,
        default_on_volume: Volume,
    ) -> Self {
        Self {
            transport,
            adapter,
            cache: Arc::new(VolumeCache::new(default_on_volume)),
            update_delay: UPDATE_DELAY,
        }
    }

    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    pub fn cache(&self) -> &VolumeCache {
        &self.cache
    }

    pub fn state(&self) -> VolumeState {
        self.cache.get()
    }

    /// Read the receiver volume once and publish it
    ///
    /// On failure the cache is left alone and both characteristics receive
    /// the error. The returned result is informational; the poll loop ignores it.
    pub async fn poll(&self) -> Result<Volume> {
        match self.transport.get_volume().await {
            Ok(volume) => {
                debug!(volume, "read from receiver");
                if let Some(change) = self.cache.update(volume) {
                    info!(
                        old = %change.old_volume,
                        new = %change.new_volume,
                        power_changed = change.power_changed(),
                        "receiver volume changed"
                    );
                }
                self.schedule_update();
                Ok(Volume::new(volume))
            }
            Err(e) => {
                let error = AccessoryError::from(e);
                warn!(error = %error, "poll failed");
                self.push_error(Characteristic::On, &error);
                self.push_error(Characteristic::Brightness, &error);
                Err(error)
            }
        }
    }

    /// Framework asked for the power state
    ///
    /// Always re-reads the receiver. On failure the stale cached state is
    /// returned and the error goes out on the On characteristic.
    pub async fn get_on(&self) -> bool {
        debug!("power state requested");
        match self.transport.get_volume().await {
            Ok(volume) => {
                let volume = Volume::new(volume);
                self.cache.set(volume.value());
                self.adapter.update_characteristic(
                    Characteristic::Brightness,
                    Ok(CharacteristicValue::Brightness(volume.value())),
                );
                volume.is_on()
            }
            Err(e) => {
                let error = AccessoryError::from(e);
                warn!(error = %error, "power state read failed, serving cached value");
                self.push_error(Characteristic::On, &error);
                self.cache.volume().is_on()
            }
        }
    }

    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.set_on_with_intent(on, PowerIntent::Toggle).await
    }

    /// Switch the light on (default-on volume) or off (volume 0)
    pub async fn set_on_with_intent(&self, on: bool, intent: PowerIntent) -> Result<()> {
        if on && intent == PowerIntent::Slider {
            debug!("switch-on carried by brightness write, keeping slider volume");
            return Ok(());
        }

        let target = if on {
            self.cache.default_on_volume()
        } else {
            Volume::MUTED
        };
        info!(on, volume = %target, "setting power state");

        match self.transport.set_volume(target.value()).await {
            Ok(()) => {
                info!(volume = %target, "request sent to set volume");
                self.cache.set(target.value());
                self.schedule_update();
                Ok(())
            }
            Err(e) => {
                let error = AccessoryError::from(e);
                warn!(error = %error, "failed to set power state");
                self.push_error(Characteristic::On, &error);
                Err(error)
            }
        }
    }

    /// Framework asked for the brightness; served from the cache
    pub fn get_brightness(&self) -> u8 {
        debug!("brightness requested");
        self.cache.volume().value()
    }

    /// Set the receiver volume from the brightness slider
    ///
    /// A value of exactly 100 (after clamping) is ignored.
    pub async fn set_brightness(&self, value: u8) -> Result<()> {
        self.apply_brightness(value).await.map(|_| ())
    }

    /// Apply one framework write, brightness first
    pub async fn handle_write(&self, request: WriteRequest) -> Result<()> {
        let mut intent = PowerIntent::Toggle;

        if let Some(brightness) = request.brightness {
            if self.apply_brightness(brightness).await? {
                intent = PowerIntent::Slider;
            }
        }

        if let Some(on) = request.on {
            self.set_on_with_intent(on, intent).await?;
        }

        Ok(())
    }

    /// Returns whether a request was dispatched
    async fn apply_brightness(&self, value: u8) -> Result<bool> {
        let volume = Volume::new(value);
        if volume.value() == IGNORED_BRIGHTNESS {
            debug!("ignoring brightness 100");
            return Ok(false);
        }

        info!(%volume, "setting brightness");
        match self.transport.set_volume(volume.value()).await {
            Ok(()) => {
                info!(%volume, "request sent to set volume");
                self.cache.set(volume.value());
                self.schedule_update();
                Ok(true)
            }
            Err(e) => {
                let error = AccessoryError::from(e);
                warn!(error = %error, "failed to set brightness");
                self.push_error(Characteristic::Brightness, &error);
                Err(error)
            }
        }
    }

    /// Push (On, Brightness) after the update delay, read from the cache when it fires
    fn schedule_update(&self) {
        let adapter = Arc::clone(&self.adapter);
        let cache = Arc::clone(&self.cache);
        let delay = self.update_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            push_state(adapter.as_ref(), cache.volume());
        });
    }

    fn push_error(&self, characteristic: Characteristic, error: &AccessoryError) {
        self.adapter
            .update_characteristic(characteristic, Err(error.clone()));
    }
}

fn push_state(adapter: &dyn AccessoryAdapter, volume: Volume) {
    adapter.update_characteristic(
        Characteristic::On,
        Ok(CharacteristicValue::On(volume.is_on())),
    );
    adapter.update_characteristic(
        Characteristic::Brightness,
        Ok(CharacteristicValue::Brightness(volume.value())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAdapter, ScriptedTransport};
    use receiver_client::{ReceiverCommand, TransportError};

    fn engine_with(
        default_on: u8,
    ) -> (SyncEngine, Arc<ScriptedTransport>, Arc<RecordingAdapter>) {
        let transport = Arc::new(ScriptedTransport::new(0));
        let adapter = Arc::new(RecordingAdapter::new());
        let engine = SyncEngine::new(
            transport.clone(),
            adapter.clone(),
            Volume::new(default_on),
        );
        (engine, transport, adapter)
    }

    fn refused() -> TransportError {
        TransportError::Network("connection refused".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_updates_cache_after_delay() {
        let (engine, transport, adapter) = engine_with(10);
        transport.set_receiver_volume(42);

        assert_eq!(engine.poll().await, Ok(Volume::new(42)));
        assert_eq!(engine.get_brightness(), 42);
        assert!(adapter.is_empty(), "push is deferred");

        tokio::time::sleep(UPDATE_DELAY * 2).await;
        assert_eq!(
            adapter.last_value(Characteristic::On),
            Some(CharacteristicValue::On(true))
        );
        assert_eq!(
            adapter.last_value(Characteristic::Brightness),
            Some(CharacteristicValue::Brightness(42))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_keeps_cache() {
        let (engine, transport, adapter) = engine_with(10);
        engine.cache().set(33);
        transport.fail_with(refused());

        assert!(engine.poll().await.is_err());
        assert_eq!(engine.get_brightness(), 33);
        assert_eq!(adapter.error_count(Characteristic::On), 1);
        assert_eq!(adapter.error_count(Characteristic::Brightness), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_rejects_garbage_body() {
        let (engine, transport, adapter) = engine_with(10);
        engine.cache().set(12);
        transport.respond_with_body("not a number");

        let result = engine.poll().await;
        assert!(matches!(
            result,
            Err(AccessoryError::Transport(TransportError::Protocol(_)))
        ));
        assert_eq!(engine.get_brightness(), 12);
        assert_eq!(adapter.error_count(Characteristic::On), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_on_reads_receiver() {
        let (engine, transport, adapter) = engine_with(10);
        transport.set_receiver_volume(25);

        assert!(engine.get_on().await);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests(), vec![ReceiverCommand::GetVolume]);
        assert_eq!(engine.get_brightness(), 25);
        assert_eq!(
            adapter.last_value(Characteristic::Brightness),
            Some(CharacteristicValue::Brightness(25))
        );

        transport.set_receiver_volume(0);
        assert!(!engine.get_on().await);
        assert_eq!(transport.request_count(), 2);
    }

    /// Stands in for a poll response landing while `get_on` is publishing
    struct OverwritingAdapter {
        engine: parking_lot::Mutex<Option<Arc<SyncEngine>>>,
        overwrite_with: u8,
    }

    impl AccessoryAdapter for OverwritingAdapter {
        fn update_characteristic(
            &self,
            characteristic: Characteristic,
            _value: std::result::Result<CharacteristicValue, AccessoryError>,
        ) {
            if characteristic == Characteristic::Brightness {
                if let Some(engine) = self.engine.lock().as_ref() {
                    engine.cache().set(self.overwrite_with);
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_on_returns_the_volume_it_read() {
        let transport = Arc::new(ScriptedTransport::new(0));
        let adapter = Arc::new(OverwritingAdapter {
            engine: parking_lot::Mutex::new(None),
            overwrite_with: 50,
        });
        let engine = Arc::new(SyncEngine::new(
            transport.clone(),
            adapter.clone(),
            Volume::new(10),
        ));
        *adapter.engine.lock() = Some(Arc::clone(&engine));

        assert!(!engine.get_on().await, "receiver reported 0");
        assert_eq!(engine.get_brightness(), 50, "concurrent write still wins the cache");

        transport.set_receiver_volume(30);
        adapter.engine.lock().take();
        assert!(engine.get_on().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_on_failure_serves_stale_value() {
        let (engine, transport, adapter) = engine_with(10);
        engine.cache().set(18);
        transport.fail_with(refused());

        assert!(engine.get_on().await);
        assert_eq!(engine.get_brightness(), 18);
        assert_eq!(adapter.error_count(Characteristic::On), 1);
        assert_eq!(adapter.error_count(Characteristic::Brightness), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_on_uses_default_volume() {
        let (engine, transport, adapter) = engine_with(15);

        engine.set_on(true).await.unwrap();
        assert_eq!(transport.requests(), vec![ReceiverCommand::SetVolume(15)]);
        assert_eq!(engine.state().volume.value(), 15);
        assert_eq!(transport.receiver_volume(), 15);

        tokio::time::sleep(UPDATE_DELAY * 2).await;
        assert_eq!(
            adapter.last_value(Characteristic::On),
            Some(CharacteristicValue::On(true))
        );
        assert_eq!(
            adapter.last_value(Characteristic::Brightness),
            Some(CharacteristicValue::Brightness(15))
        );

        engine.set_on(false).await.unwrap();
        assert_eq!(engine.state().volume, Volume::MUTED);
        assert_eq!(transport.last_request(), Some(ReceiverCommand::SetVolume(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_on_failure_reports_error() {
        let (engine, transport, adapter) = engine_with(15);
        engine.cache().set(40);
        transport.fail_with(refused());

        let result = engine.set_on(false).await;
        assert!(result.unwrap_err().is_network());
        assert_eq!(engine.get_brightness(), 40);
        assert_eq!(adapter.error_count(Characteristic::On), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slider_switch_on_keeps_volume() {
        let (engine, transport, _adapter) = engine_with(15);

        engine.handle_write(WriteRequest::slider(60)).await.unwrap();
        assert_eq!(transport.requests(), vec![ReceiverCommand::SetVolume(60)]);
        assert_eq!(engine.get_brightness(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_brightness_does_not_suppress_power() {
        let (engine, transport, _adapter) = engine_with(15);

        engine.handle_write(WriteRequest::slider(100)).await.unwrap();
        assert_eq!(transport.requests(), vec![ReceiverCommand::SetVolume(15)]);
        assert_eq!(engine.get_brightness(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_off_with_brightness() {
        let (engine, transport, _adapter) = engine_with(15);

        engine
            .handle_write(WriteRequest {
                on: Some(false),
                brightness: Some(30),
            })
            .await
            .unwrap();
        assert_eq!(
            transport.requests(),
            vec![ReceiverCommand::SetVolume(30), ReceiverCommand::SetVolume(0)]
        );
        assert_eq!(engine.get_brightness(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_brightness_100_is_noop() {
        let (engine, transport, adapter) = engine_with(15);
        engine.cache().set(20);

        engine.set_brightness(100).await.unwrap();
        engine.set_brightness(250).await.unwrap();
        tokio::time::sleep(UPDATE_DELAY * 2).await;

        assert_eq!(transport.request_count(), 0);
        assert_eq!(engine.get_brightness(), 20);
        assert!(adapter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_brightness_failure() {
        let (engine, transport, adapter) = engine_with(15);
        engine.cache().set(20);
        transport.fail_with(refused());

        assert!(engine.set_brightness(50).await.is_err());
        assert_eq!(engine.get_brightness(), 20);
        assert_eq!(adapter.error_count(Characteristic::Brightness), 1);
        assert_eq!(adapter.error_count(Characteristic::On), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_response_wins() {
        let (engine, transport, _adapter) = engine_with(15);
        let engine = Arc::new(engine);
        transport.set_receiver_volume(70);
        transport.set_latency(Duration::from_millis(50));

        // Set dispatched first, poll read lands after it
        let setter = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.set_brightness(30).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        transport.set_receiver_volume(80);
        let poller = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.poll().await })
        };

        setter.await.unwrap().unwrap();
        poller.await.unwrap().unwrap();
        assert_eq!(engine.get_brightness(), 80);
    }
}
