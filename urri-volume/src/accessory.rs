//! Smart-home accessory seam
//!
//! The smart-home framework models the receiver as a lightbulb service with
//! an On characteristic and a Brightness characteristic. The framework itself
//! is external; this module defines what the engine pushes to it and what a
//! framework write looks like when it reaches the engine.

use std::fmt;

use crate::error::AccessoryError;

/// Manufacturer reported in the accessory information service
pub const MANUFACTURER: &str = "URRI";

/// Model reported in the accessory information service
pub const MODEL: &str = "URRI receiver Volume control";

/// Characteristics of the lightbulb service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Power, mapped to muted (off) / unmuted (on)
    On,
    /// Brightness 0-100, mapped to the receiver volume
    Brightness,
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Characteristic::On => write!(f, "On"),
            Characteristic::Brightness => write!(f, "Brightness"),
        }
    }
}

/// Value carried by a characteristic update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicValue {
    On(bool),
    Brightness(u8),
}

impl CharacteristicValue {
    pub fn characteristic(&self) -> Characteristic {
        match self {
            CharacteristicValue::On(_) => Characteristic::On,
            CharacteristicValue::Brightness(_) => Characteristic::Brightness,
        }
    }
}

/// Receiver of out-of-band updates, implemented by the framework binding
///
/// Mirrors the framework's "update characteristic with a value or an error"
/// call. Implementations must not block; they are invoked from async tasks.
pub trait AccessoryAdapter: Send + Sync {
    fn update_characteristic(
        &self,
        characteristic: Characteristic,
        value: Result<CharacteristicValue, AccessoryError>,
    );
}

/// Static identification exposed by the accessory information service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl AccessoryInformation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }
}

/// Description of the lightbulb service the framework should register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightbulbService {
    pub name: String,
    pub characteristics: [Characteristic; 2],
}

impl LightbulbService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            characteristics: [Characteristic::On, Characteristic::Brightness],
        }
    }
}

/// One framework write, which may set both characteristics at once
///
/// Dragging the brightness slider of a light that is off produces a write
/// carrying both `on = true` and the new brightness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteRequest {
    pub on: Option<bool>,
    pub brightness: Option<u8>,
}

impl WriteRequest {
    pub fn on(on: bool) -> Self {
        Self {
            on: Some(on),
            brightness: None,
        }
    }

    pub fn brightness(brightness: u8) -> Self {
        Self {
            on: None,
            brightness: Some(brightness),
        }
    }

    /// Write produced by the brightness slider, which also switches the light on
    pub fn slider(brightness: u8) -> Self {
        Self {
            on: Some(true),
            brightness: Some(brightness),
        }
    }
}
