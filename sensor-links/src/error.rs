use core::fmt::Debug;

use embedded_hal::i2c::ErrorKind;

/// A frame arrived intact enough to inspect but failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParsingError {
    #[error("frame header mismatch")]
    Header,
    #[error("frame checksum mismatch")]
    Checksum,
    #[error("word CRC mismatch")]
    Crc,
}

/// Failure of a single I2C transaction.
#[derive(Debug, thiserror::Error)]
pub enum Error<Open: Debug> {
    #[error("failed to open the i2c bus: {0:?}")]
    Open(Open),
    #[error("sensor did not acknowledge its address")]
    Address,
    #[error("i2c transfer failed: {0}")]
    Bus(ErrorKind),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
}

impl<Open: Debug> Error<Open> {
    pub(crate) fn from_bus<E: embedded_hal::i2c::Error>(e: E) -> Self {
        match e.kind() {
            ErrorKind::NoAcknowledge(embedded_hal::i2c::NoAcknowledgeSource::Address) => {
                Self::Address
            }
            kind => Self::Bus(kind),
        }
    }
}
