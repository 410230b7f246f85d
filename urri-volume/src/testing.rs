//! In-memory receiver and adapter for tests
//!
//! Enabled with the `test-support` feature.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use receiver_client::{ReceiverCommand, Transport, TransportError};

use crate::accessory::{AccessoryAdapter, Characteristic, CharacteristicValue};
use crate::error::AccessoryError;

#[derive(Debug, Default)]
struct ReceiverSim {
    volume: u8,
    failure: Option<TransportError>,
    body_override: Option<String>,
    latency: Duration,
    requests: Vec<ReceiverCommand>,
}

/// Simulated receiver that records every command it receives
///
/// A command takes effect when it is dispatched; the response is returned
/// after the configured latency. This makes the arrival order of responses
/// controllable independently of dispatch order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    sim: Mutex<ReceiverSim>,
}

impl ScriptedTransport {
    pub fn new(volume: u8) -> Self {
        Self {
            sim: Mutex::new(ReceiverSim {
                volume,
                ..Default::default()
            }),
        }
    }

    /// Simulate someone turning the knob on the receiver
    pub fn set_receiver_volume(&self, volume: u8) {
        self.sim.lock().volume = volume;
    }

    pub fn receiver_volume(&self) -> u8 {
        self.sim.lock().volume
    }

    /// Fail every subsequent command with `error`
    pub fn fail_with(&self, error: TransportError) {
        self.sim.lock().failure = Some(error);
    }

    pub fn recover(&self) {
        self.sim.lock().failure = None;
    }

    /// Answer `/getVolume` with a fixed body instead of the volume
    pub fn respond_with_body(&self, body: impl Into<String>) {
        self.sim.lock().body_override = Some(body.into());
    }

    pub fn set_latency(&self, latency: Duration) {
        self.sim.lock().latency = latency;
    }

    pub fn requests(&self) -> Vec<ReceiverCommand> {
        self.sim.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.sim.lock().requests.len()
    }

    pub fn count_of(&self, command: ReceiverCommand) -> usize {
        self.sim
            .lock()
            .requests
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    pub fn last_request(&self) -> Option<ReceiverCommand> {
        self.sim.lock().requests.last().copied()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, command: ReceiverCommand) -> Result<String, TransportError> {
        let (result, latency) = {
            let mut guard = self.sim.lock();
            let sim = &mut *guard;
            sim.requests.push(command);

            let result = match (&sim.failure, command) {
                (Some(error), _) => Err(error.clone()),
                (None, ReceiverCommand::GetVolume) => Ok(sim
                    .body_override
                    .clone()
                    .unwrap_or_else(|| sim.volume.to_string())),
                (None, ReceiverCommand::SetVolume(value)) => {
                    sim.volume = value;
                    Ok("OK".to_string())
                }
            };
            (result, sim.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

/// A single recorded update
pub type RecordedUpdate = (Characteristic, Result<CharacteristicValue, AccessoryError>);

/// Adapter that keeps every pushed update in memory
///
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    updates: Mutex<Vec<RecordedUpdate>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }

    pub fn clear(&self) {
        self.updates.lock().clear();
    }

    /// Most recent successful value pushed for `characteristic`
    pub fn last_value(&self, characteristic: Characteristic) -> Option<CharacteristicValue> {
        self.updates
            .lock()
            .iter()
            .rev()
            .filter(|(c, _)| *c == characteristic)
            .find_map(|(_, value)| value.as_ref().ok().copied())
    }

    /// Number of errors pushed for `characteristic`
    pub fn error_count(&self, characteristic: Characteristic) -> usize {
        self.updates
            .lock()
            .iter()
            .filter(|(c, value)| *c == characteristic && value.is_err())
            .count()
    }
}

impl AccessoryAdapter for RecordingAdapter {
    fn update_characteristic(
        &self,
        characteristic: Characteristic,
        value: Result<CharacteristicValue, AccessoryError>,
    ) {
        self.updates.lock().push((characteristic, value));
    }
}
