//! Sensor links for the CO2 analyzer, the dust sensor and the SHTC3.
//!
//! Everything here is hardware independent: serial ports come in through
//! [`serial::SerialOpen`] and the I2C bus through [`shtc3::I2cBusOpen`].
//! All three links publish through a single [`store::ReadingStore`], and
//! the [`sampler::Sampler`] drives them from one event loop.

pub mod co2;
pub mod config;
pub mod crc;
pub mod dust;
mod error;
pub mod sampler;
pub mod serial;
pub mod shtc3;
pub mod store;

pub use config::SensorConfig;
pub use error::{Error, ParsingError};
pub use sampler::Sampler;
pub use store::ReadingStore;
