use crc_all::Crc;

/// CRC-8 used by Sensirion sensors: polynomial 0x31, init 0xFF, no reflection.
pub struct SensirionCrc {
    inner: Crc<u8>,
}

impl SensirionCrc {
    pub fn new() -> Self {
        Self {
            inner: Crc::<u8>::new(0x31, 8, 0xff, 0x00, false),
        }
    }

    pub fn calculate(&mut self, input: &[u8]) -> u8 {
        self.inner.init();
        self.inner.update(input);
        self.inner.finish()
    }

    /// Checks a `[msb, lsb, crc]` word as sent by the sensor.
    pub fn verify_word(&mut self, word: &[u8]) -> bool {
        word.len() == 3 && self.calculate(&word[..2]) == word[2]
    }
}

impl Default for SensirionCrc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc() {
        let mut crc = SensirionCrc::new();

        assert_eq!(0x92, crc.calculate(&[0xbe, 0xef]));
        assert_eq!(0x81, crc.calculate(&[0x00, 0x00]));
        assert_eq!(0x93, crc.calculate(&[0x66, 0x66]));
    }

    #[test]
    fn state_is_reset_between_calculations() {
        let mut crc = SensirionCrc::new();

        let first = crc.calculate(&[0xbe, 0xef]);
        let second = crc.calculate(&[0xbe, 0xef]);
        assert_eq!(first, second);
    }

    #[test]
    fn word_verification() {
        let mut crc = SensirionCrc::new();

        assert!(crc.verify_word(&[0xbe, 0xef, 0x92]));
        assert!(!crc.verify_word(&[0xbe, 0xee, 0x92]));
        assert!(!crc.verify_word(&[0xbe, 0xef]));
    }
}
