use std::time::Duration;

use crate::shtc3::{DEFAULT_ADDRESS, DEFAULT_CONVERSION_DELAY_MS};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Device paths and timing for the three sensor links.
#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    pub co2_port: String,
    pub co2_baud: u32,
    pub dust_port: String,
    pub dust_baud: u32,
    pub i2c_bus: String,
    /// 7-bit address of the temperature/humidity sensor
    pub i2c_address: u8,
    pub poll_interval_ms: u64,
    pub conversion_delay_ms: u32,
}

impl SensorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            co2_port: "/dev/ttyUSB0".into(),
            co2_baud: DEFAULT_BAUD_RATE,
            dust_port: "/dev/ttyUSB1".into(),
            dust_baud: DEFAULT_BAUD_RATE,
            i2c_bus: "/dev/i2c-1".into(),
            i2c_address: DEFAULT_ADDRESS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            conversion_delay_ms: DEFAULT_CONVERSION_DELAY_MS,
        }
    }
}
