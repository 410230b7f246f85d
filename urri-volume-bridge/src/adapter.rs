//! Adapter that logs characteristic updates

use tracing::{info, warn};
use urri_volume::{AccessoryAdapter, AccessoryError, Characteristic, CharacteristicValue};

pub struct ConsoleAdapter {
    name: String,
}

impl ConsoleAdapter {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl AccessoryAdapter for ConsoleAdapter {
    fn update_characteristic(
        &self,
        characteristic: Characteristic,
        value: Result<CharacteristicValue, AccessoryError>,
    ) {
        match value {
            Ok(CharacteristicValue::On(on)) => {
                info!(accessory = %self.name, %characteristic, on, "characteristic updated")
            }
            Ok(CharacteristicValue::Brightness(brightness)) => {
                info!(accessory = %self.name, %characteristic, brightness, "characteristic updated")
            }
            Err(e) => {
                warn!(accessory = %self.name, %characteristic, error = %e, "characteristic error")
            }
        }
    }
}
