//! SHTC3 temperature/humidity sensor, one complete I2C transaction per poll.
//!
//! The bus is opened for the transaction and dropped straight after the
//! read, so nothing holds it between polls.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;
use shared::Reading;

use crate::crc::SensirionCrc;
use crate::error::{Error, ParsingError};
use crate::store::ReadingStore;

pub const DEFAULT_ADDRESS: u8 = 0x70;
pub const DEFAULT_CONVERSION_DELAY_MS: u32 = 15;

const RESPONSE_LEN: usize = 6;

/// Normal mode, temperature first, clock stretching disabled.
const MEASURE_TEMPERATURE_FIRST: [u8; 2] = [0x78, 0x66];

/// Opens the I2C bus for a single transaction. Dropping the returned bus
/// must release it.
pub trait I2cBusOpen {
    type Bus<'a>: I2c
    where
        Self: 'a;
    type Error: Debug;

    fn open(&mut self) -> Result<Self::Bus<'_>, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature: f32,
    pub humidity: f32,
}

pub(crate) fn parse_measurement(
    data: &[u8; RESPONSE_LEN],
    crc: &mut SensirionCrc,
) -> Result<Measurement, ParsingError> {
    if !crc.verify_word(&data[..3]) || !crc.verify_word(&data[3..]) {
        return Err(ParsingError::Crc);
    }

    let raw_temperature = f64::from(u16::from_be_bytes([data[0], data[1]]));
    let raw_humidity = f64::from(u16::from_be_bytes([data[3], data[4]]));

    Ok(Measurement {
        temperature: (-45.0 + 175.0 * raw_temperature / 65535.0) as f32,
        humidity: (100.0 * raw_humidity / 65535.0) as f32,
    })
}

pub struct TempHumidityLink<O, D> {
    opener: O,
    delay: D,
    address: u8,
    conversion_delay_ms: u32,
    crc: SensirionCrc,
}

impl<O, D> TempHumidityLink<O, D>
where
    O: I2cBusOpen,
    D: DelayNs,
{
    pub fn new(opener: O, delay: D) -> Self {
        Self {
            opener,
            delay,
            address: DEFAULT_ADDRESS,
            conversion_delay_ms: DEFAULT_CONVERSION_DELAY_MS,
            crc: SensirionCrc::new(),
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_conversion_delay_ms(mut self, delay_ms: u32) -> Self {
        self.conversion_delay_ms = delay_ms;
        self
    }

    /// Performs open, trigger, wait, read and close, then validates.
    ///
    /// The conversion wait blocks the calling thread.
    pub fn measure(&mut self) -> Result<Measurement, Error<O::Error>> {
        let mut data = [0u8; RESPONSE_LEN];
        {
            let mut bus = self.opener.open().map_err(Error::Open)?;
            bus.write(self.address, &MEASURE_TEMPERATURE_FIRST).map_err(Error::from_bus)?;

            self.delay.delay_ms(self.conversion_delay_ms);

            bus.read(self.address, &mut data).map_err(Error::from_bus)?;
        }

        Ok(parse_measurement(&data, &mut self.crc)?)
    }

    /// Runs one transaction and publishes both values, or neither.
    pub fn poll(&mut self, store: &mut ReadingStore) -> Option<Measurement> {
        match self.measure() {
            Ok(measurement) => {
                store.update(Reading::Temperature(measurement.temperature));
                store.update(Reading::Humidity(measurement.humidity));
                Some(measurement)
            }
            Err(e) => {
                warn!("SHTC3 transaction failed: {}", e);
                None
            }
        }
    }
}
