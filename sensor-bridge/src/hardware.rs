//! Concrete openers for the Linux UART and I2C devices.

use std::io;
use std::path::PathBuf;

use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use sensor_links::serial::SerialOpen;
use sensor_links::shtc3::I2cBusOpen;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// 8N1 serial port without flow control.
pub struct SerialOpener {
    path: String,
    baud_rate: u32,
}

impl SerialOpener {
    pub fn new(path: &str, baud_rate: u32) -> Self {
        Self {
            path: path.to_string(),
            baud_rate,
        }
    }
}

impl SerialOpen for SerialOpener {
    type Port = SerialStream;

    fn open(&mut self) -> io::Result<SerialStream> {
        tokio_serial::new(self.path.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)
    }

    fn name(&self) -> &str {
        &self.path
    }
}

/// `/dev/i2c-N` character device, opened per transaction. Dropping the
/// `I2cdev` closes the file descriptor.
pub struct LinuxI2cBus {
    path: PathBuf,
}

impl LinuxI2cBus {
    pub fn new(path: &str) -> Self {
        Self { path: path.into() }
    }
}

impl I2cBusOpen for LinuxI2cBus {
    type Bus<'a> = I2cdev;
    type Error = LinuxI2CError;

    fn open(&mut self) -> Result<I2cdev, LinuxI2CError> {
        I2cdev::new(&self.path)
    }
}
