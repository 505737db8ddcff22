//! NDIR CO2 analyzer on a UART, request/response.
//!
//! Every request is the fixed "read concentration" command. The 9-byte
//! response starts with `FF 86`, carries the concentration big-endian in
//! bytes 2..=3 and ends with a checksum over bytes 1..=7.

use log::{debug, warn};
use shared::Reading;

use crate::error::ParsingError;
use crate::serial::{LinkState, SerialLink, SerialOpen};
use crate::store::ReadingStore;

pub const FRAME_LEN: usize = 9;

const START_BYTE: u8 = 0xff;
const READ_CONCENTRATION: u8 = 0x86;

/// `FF 01 86 00 00 00 00 00 79`: sensor 1, read gas concentration.
pub const READ_COMMAND: [u8; FRAME_LEN] = [
    START_BYTE,
    0x01,
    READ_CONCENTRATION,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x79,
];

/// Two's complement of the byte sum over `frame[1..8]`.
pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    let sum = frame[1..8].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xffu8.wrapping_sub(sum).wrapping_add(1)
}

/// Validates a response frame and extracts the concentration in ppm.
pub fn parse_response(frame: &[u8; FRAME_LEN]) -> Result<u16, ParsingError> {
    if frame[0] != START_BYTE || frame[1] != READ_CONCENTRATION {
        return Err(ParsingError::Header);
    }
    if checksum(frame) != frame[8] {
        return Err(ParsingError::Checksum);
    }
    Ok(u16::from_be_bytes([frame[2], frame[3]]))
}

pub struct Co2Link<O: SerialOpen> {
    serial: SerialLink<O>,
    state: LinkState,
    scratch: Vec<u8>,
}

impl<O: SerialOpen> Co2Link<O> {
    pub fn new(opener: O) -> Self {
        Self {
            serial: SerialLink::new(opener),
            state: LinkState::Closed,
            scratch: Vec::with_capacity(FRAME_LEN * 2),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Opens the port if needed and writes the read command. Any failure
    /// skips this tick; the next tick tries again.
    pub async fn request(&mut self) {
        if !self.serial.ensure_open() {
            self.state = LinkState::Closed;
            return;
        }

        match self.serial.write_all(&READ_COMMAND).await {
            Ok(()) => self.state = LinkState::AwaitingResponse,
            Err(_) => self.closed(),
        }
    }

    pub async fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        self.serial.read(buffer).await
    }

    /// Feeds the outcome of [`Co2Link::read`] into the frame parser.
    pub fn on_read(
        &mut self,
        result: std::io::Result<usize>,
        buffer: &[u8],
        store: &mut ReadingStore,
    ) {
        let read = self.serial.settle_read(result);
        if !self.serial.is_open() {
            self.closed();
        }
        if read > 0 {
            self.on_bytes_received(&buffer[..read], store);
        }
    }

    /// Appends `bytes` and consumes every complete response now buffered.
    /// Returns the last concentration published, if any.
    ///
    /// There is no resynchronisation: a buffer that does not begin with the
    /// response header is dropped whole.
    pub fn on_bytes_received(&mut self, bytes: &[u8], store: &mut ReadingStore) -> Option<u16> {
        self.scratch.extend_from_slice(bytes);

        let mut latest = None;
        while self.scratch.len() >= FRAME_LEN {
            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&self.scratch[..FRAME_LEN]);

            match parse_response(&frame) {
                Ok(ppm) => {
                    self.scratch.drain(..FRAME_LEN);
                    if self.state == LinkState::AwaitingResponse {
                        self.state = LinkState::Open;
                    }
                    store.update(Reading::Co2Ppm(ppm));
                    latest = Some(ppm);
                }
                Err(ParsingError::Header) => {
                    debug!("Discarding {} misaligned CO2 bytes", self.scratch.len());
                    self.scratch.clear();
                }
                Err(e) => {
                    warn!("Dropping CO2 response: {}", e);
                    self.scratch.drain(..FRAME_LEN);
                }
            }
        }
        latest
    }

    /// Bytes held back waiting for the rest of a response.
    pub fn buffered(&self) -> usize {
        self.scratch.len()
    }

    pub fn close(&mut self) {
        self.serial.close();
        self.closed();
    }

    /// Bytes from a previous connection never complete a frame on the next.
    fn closed(&mut self) {
        self.state = LinkState::Closed;
        self.scratch.clear();
    }
}
