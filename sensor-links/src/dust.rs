//! Particulate sensor streaming unframed 10-byte reports over a UART.
//!
//! Report layout: `AA`, command byte, PM2.5 (little-endian, ×10),
//! PM10 (little-endian, ×10), two id bytes, checksum over bytes 2..=7, `AB`.

use log::debug;
use shared::Reading;

use crate::error::ParsingError;
use crate::serial::{SerialLink, SerialOpen};
use crate::store::ReadingStore;

pub const FRAME_LEN: usize = 10;

const HEAD: u8 = 0xaa;
const TAIL: u8 = 0xab;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticulateMatter {
    /// Mass Concentration PM2.5 [μg/m³]
    pub mass_pm2_5: f32,
    /// Mass Concentration PM10 [μg/m³]
    pub mass_pm10: f32,
}

/// Low byte of the sum over the six data bytes.
pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    frame[2..8].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn tenths(lo: u8, hi: u8) -> f32 {
    (f64::from(u16::from_le_bytes([lo, hi])) / 10.0) as f32
}

pub fn parse_frame(frame: &[u8; FRAME_LEN]) -> Result<ParticulateMatter, ParsingError> {
    if frame[0] != HEAD || frame[9] != TAIL {
        return Err(ParsingError::Header);
    }
    if checksum(frame) != frame[8] {
        return Err(ParsingError::Checksum);
    }
    Ok(ParticulateMatter {
        mass_pm2_5: tenths(frame[2], frame[3]),
        mass_pm10: tenths(frame[4], frame[5]),
    })
}

/// Recovers frame alignment from an arbitrary byte stream.
#[derive(Debug, Default)]
pub struct DustStreamParser {
    buffer: Vec<u8>,
}

impl DustStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every valid report now complete.
    ///
    /// Whenever ten or more bytes are buffered the parser aligns on the first
    /// `AA`; without one the whole buffer is dropped. A candidate whose tenth
    /// byte is not `AB` costs one byte, so a spurious `AA` in the payload
    /// only shifts the search by one. A complete candidate is always
    /// consumed, whether or not its checksum matches.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ParticulateMatter> {
        self.buffer.extend_from_slice(bytes);

        let mut reports = Vec::new();
        while self.buffer.len() >= FRAME_LEN {
            let Some(start) = self.buffer.iter().position(|b| *b == HEAD) else {
                debug!("No dust frame marker in {} bytes", self.buffer.len());
                self.buffer.clear();
                break;
            };
            if start > 0 {
                self.buffer.drain(..start);
            }
            if self.buffer.len() < FRAME_LEN {
                break;
            }
            if self.buffer[FRAME_LEN - 1] != TAIL {
                self.buffer.drain(..1);
                continue;
            }

            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&self.buffer[..FRAME_LEN]);
            match parse_frame(&frame) {
                Ok(report) => reports.push(report),
                Err(e) => debug!("Dropping dust frame: {}", e),
            }
            self.buffer.drain(..FRAME_LEN);
        }
        reports
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Forgets any partial report, e.g. when the port is reopened.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Push-driven link: nothing is ever written to this port.
pub struct DustLink<O: SerialOpen> {
    serial: SerialLink<O>,
    parser: DustStreamParser,
}

impl<O: SerialOpen> DustLink<O> {
    pub fn new(opener: O) -> Self {
        Self {
            serial: SerialLink::new(opener),
            parser: DustStreamParser::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.serial.is_open()
    }

    pub fn ensure_open(&mut self) -> bool {
        self.serial.ensure_open()
    }

    pub async fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        self.serial.read(buffer).await
    }

    pub fn on_read(
        &mut self,
        result: std::io::Result<usize>,
        buffer: &[u8],
        store: &mut ReadingStore,
    ) {
        let read = self.serial.settle_read(result);
        if !self.serial.is_open() {
            self.parser.reset();
        }
        if read > 0 {
            self.on_bytes_received(&buffer[..read], store);
        }
    }

    /// Runs the parser over `bytes` and publishes every report found.
    /// Returns the number of valid reports.
    pub fn on_bytes_received(&mut self, bytes: &[u8], store: &mut ReadingStore) -> usize {
        let reports = self.parser.push(bytes);
        for report in &reports {
            store.update(Reading::Pm2_5(report.mass_pm2_5));
            store.update(Reading::Pm10(report.mass_pm10));
        }
        reports.len()
    }

    pub fn buffered(&self) -> usize {
        self.parser.buffered()
    }

    pub fn close(&mut self) {
        self.serial.close();
        self.parser.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::testing::DuplexOpener;
    use tokio::io::AsyncWriteExt;

    fn frame(pm2_5: u16, pm10: u16) -> [u8; FRAME_LEN] {
        let [a, b] = pm2_5.to_le_bytes();
        let [c, d] = pm10.to_le_bytes();
        let mut frame = [HEAD, 0xc0, a, b, c, d, 0x12, 0x34, 0x00, TAIL];
        frame[8] = checksum(&frame);
        frame
    }

    #[test]
    fn known_frame() {
        let raw = [0xaa, 0x00, 0x0a, 0x00, 0x14, 0x00, 0x00, 0x00, 0x1e, 0xab];
        let mut parser = DustStreamParser::new();

        let reports = parser.push(&raw);
        assert_eq!(
            reports,
            vec![ParticulateMatter {
                mass_pm2_5: 1.0,
                mass_pm10: 2.0
            }]
        );
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn garbage_between_frames() {
        let mut stream = vec![0x01, 0x02, 0xab, 0x7f];
        stream.extend_from_slice(&frame(123, 456));
        stream.extend_from_slice(&[0x00, 0xff, 0x10, 0x20, 0x30, 0xab, 0x55]);
        stream.extend_from_slice(&frame(789, 1011));

        let mut parser = DustStreamParser::new();
        let reports = parser.push(&stream);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].mass_pm2_5, 12.3);
        assert_eq!(reports[0].mass_pm10, 45.6);
        assert_eq!(reports[1].mass_pm2_5, 78.9);
        assert_eq!(reports[1].mass_pm10, 101.1);
    }

    #[test]
    fn byte_by_byte_delivery() {
        let mut stream = vec![0x42; 5];
        stream.extend_from_slice(&frame(55, 66));
        stream.extend_from_slice(&frame(77, 88));

        let mut parser = DustStreamParser::new();
        let reports: Vec<_> = stream.iter().flat_map(|b| parser.push(&[*b])).collect();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].mass_pm10, 8.8);
    }

    #[test]
    fn buffer_without_marker_is_cleared() {
        let mut parser = DustStreamParser::new();
        let reports = parser.push(&[0x11; 15]);

        assert!(reports.is_empty());
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn short_tail_after_marker_waits() {
        let mut parser = DustStreamParser::new();
        let full = frame(10, 20);
        let mut stream = vec![0x01; 6];
        stream.extend_from_slice(&full[..7]);

        assert!(parser.push(&stream).is_empty());
        assert_eq!(parser.buffered(), 7);

        let reports = parser.push(&full[7..]);
        assert_eq!(reports.len(), 1);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn spurious_marker_shifts_by_one_byte() {
        let mut stream = vec![HEAD, 0x01];
        stream.extend_from_slice(&frame(30, 40));

        let mut parser = DustStreamParser::new();
        let reports = parser.push(&stream);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].mass_pm2_5, 3.0);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn bad_checksum_is_consumed() {
        let mut corrupted = frame(30, 40);
        corrupted[8] = corrupted[8].wrapping_add(1);
        let mut stream = corrupted.to_vec();
        stream.extend_from_slice(&frame(50, 60));

        let mut parser = DustStreamParser::new();
        let reports = parser.push(&stream);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].mass_pm2_5, 5.0);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn identical_reports_notify_once() {
        let mut link = DustLink::new(DuplexOpener::unavailable());
        let mut store = ReadingStore::new();
        let mut changes = store.subscribe();

        let mut stream = frame(25, 35).to_vec();
        stream.extend_from_slice(&frame(25, 35));
        assert_eq!(link.on_bytes_received(&stream, &mut store), 2);

        assert_eq!(changes.try_recv().unwrap(), Reading::Pm2_5(2.5));
        assert_eq!(changes.try_recv().unwrap(), Reading::Pm10(3.5));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn reads_from_port() {
        let (port, mut sensor) = tokio::io::duplex(64);
        let mut link = DustLink::new(DuplexOpener::with_ports([port]));
        let mut store = ReadingStore::new();
        assert!(link.ensure_open());

        sensor.write_all(&frame(99, 199)).await.unwrap();
        let mut buffer = [0u8; 64];
        while store.pm10() == 0.0 && link.is_open() {
            let result = link.read(&mut buffer).await;
            link.on_read(result, &buffer, &mut store);
        }

        assert_eq!(store.pm2_5(), 9.9);
        assert_eq!(store.pm10(), 19.9);
    }

    #[tokio::test]
    async fn partial_report_is_dropped_when_port_closes() {
        let (first, mut first_sensor) = tokio::io::duplex(64);
        let (second, mut second_sensor) = tokio::io::duplex(64);
        let mut link = DustLink::new(DuplexOpener::with_ports([first, second]));
        let mut store = ReadingStore::new();
        assert!(link.ensure_open());

        first_sensor.write_all(&frame(10, 20)[..6]).await.unwrap();
        drop(first_sensor);

        let mut buffer = [0u8; 64];
        while link.is_open() {
            let result = link.read(&mut buffer).await;
            link.on_read(result, &buffer, &mut store);
        }
        assert_eq!(link.buffered(), 0);

        assert!(link.ensure_open());
        second_sensor.write_all(&frame(30, 40)).await.unwrap();
        while store.pm10() == 0.0 {
            let result = link.read(&mut buffer).await;
            link.on_read(result, &buffer, &mut store);
        }
        assert_eq!(store.pm2_5(), 3.0);
        assert_eq!(store.pm10(), 4.0);
    }
}
