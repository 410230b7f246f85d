//! Volume state cache
//!
//! Holds the last volume observed from, or written to, the receiver. This is
//! the only state the accessory presents between polls.

use std::fmt;

use parking_lot::RwLock;

/// Receiver volume as a percentage (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Volume(u8);

impl Volume {
    pub const MUTED: Volume = Volume(0);
    pub const MAX: Volume = Volume(100);

    /// Create a volume, clamping to 100
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX.0))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// A light is "on" whenever the receiver is not muted
    pub fn is_on(&self) -> bool {
        self.0 > 0
    }
}

impl From<u8> for Volume {
    fn from(value: u8) -> Self {
        Volume::new(value)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Snapshot of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    pub volume: Volume,
    pub default_on_volume: Volume,
}

impl VolumeState {
    pub fn is_on(&self) -> bool {
        self.volume.is_on()
    }
}

/// A volume change recorded by [`VolumeCache::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeChange {
    pub old_volume: Volume,
    pub new_volume: Volume,
}

impl VolumeChange {
    /// Whether the change flips the light between on and off
    pub fn power_changed(&self) -> bool {
        self.old_volume.is_on() != self.new_volume.is_on()
    }
}

/// Last known receiver volume plus the configured default-on volume
///
/// Reads always return the last written value. The lock is never held across
/// an await point, so each handler sees its own read/write pair atomically.
#[derive(Debug)]
pub struct VolumeCache {
    volume: RwLock<Volume>,
    default_on_volume: Volume,
}

impl VolumeCache {
    /// Create a cache starting at volume 0
    pub fn new(default_on_volume: Volume) -> Self {
        Self {
            volume: RwLock::new(Volume::MUTED),
            default_on_volume,
        }
    }

    pub fn get(&self) -> VolumeState {
        VolumeState {
            volume: *self.volume.read(),
            default_on_volume: self.default_on_volume,
        }
    }

    pub fn volume(&self) -> Volume {
        *self.volume.read()
    }

    pub fn default_on_volume(&self) -> Volume {
        self.default_on_volume
    }

    /// Overwrite the cached volume (clamped to 100)
    pub fn set(&self, volume: u8) {
        *self.volume.write() = Volume::new(volume);
    }

    /// Overwrite the cached volume, returning the change if the value differs
    pub fn update(&self, volume: u8) -> Option<VolumeChange> {
        let new_volume = Volume::new(volume);
        let mut current = self.volume.write();
        let old_volume = *current;

        if old_volume != new_volume {
            *current = new_volume;
            Some(VolumeChange {
                old_volume,
                new_volume,
            })
        } else {
            None
        }
    }
}
