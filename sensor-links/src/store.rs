//! Last-known-good values and change notification.

use log::debug;
use shared::{AirQuality, Quantity, Reading};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// A stored value plus the flag telling whether it moved since it was last
/// reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorReading<T> {
    value: T,
    dirty: bool,
}

impl<T: Copy + PartialEq> SensorReading<T> {
    pub fn value(&self) -> T {
        self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stores `value` if it differs from the current one.
    ///
    /// Floats are compared with plain `!=`, so any change in the computed
    /// value counts, including conversion noise.
    pub fn set(&mut self, value: T) -> bool {
        if self.value != value {
            self.value = value;
            self.dirty = true;
            true
        } else {
            false
        }
    }

    fn clear(&mut self) {
        self.dirty = false;
    }
}

/// Single choke point for every sensor write.
///
/// Each change is broadcast as a [`Reading`]; collaborators obtain a receiver
/// with [`ReadingStore::subscribe`].
pub struct ReadingStore {
    co2_ppm: SensorReading<u16>,
    pm2_5: SensorReading<f32>,
    pm10: SensorReading<f32>,
    temperature: SensorReading<f32>,
    humidity: SensorReading<f32>,
    changes: broadcast::Sender<Reading>,
}

impl ReadingStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            co2_ppm: SensorReading::default(),
            pm2_5: SensorReading::default(),
            pm10: SensorReading::default(),
            temperature: SensorReading::default(),
            humidity: SensorReading::default(),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.changes.subscribe()
    }

    /// Publishes a freshly validated value. Returns whether it changed, in
    /// which case a notification has been sent.
    pub fn update(&mut self, reading: Reading) -> bool {
        let changed = match reading {
            Reading::Co2Ppm(ppm) => self.co2_ppm.set(ppm),
            Reading::Pm2_5(value) => self.pm2_5.set(value),
            Reading::Pm10(value) => self.pm10.set(value),
            Reading::Temperature(value) => self.temperature.set(value),
            Reading::Humidity(value) => self.humidity.set(value),
        };

        if changed {
            debug!("{} changed", reading);
            // No subscribers is fine.
            let _ = self.changes.send(reading);
        }
        changed
    }

    pub fn co2_ppm(&self) -> u16 {
        self.co2_ppm.value()
    }

    pub fn pm2_5(&self) -> f32 {
        self.pm2_5.value()
    }

    pub fn pm10(&self) -> f32 {
        self.pm10.value()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.value()
    }

    pub fn humidity(&self) -> f32 {
        self.humidity.value()
    }

    pub fn get(&self, quantity: Quantity) -> Reading {
        self.snapshot().get(quantity)
    }

    pub fn snapshot(&self) -> AirQuality {
        AirQuality {
            co2_ppm: self.co2_ppm(),
            mass_pm2_5: self.pm2_5(),
            mass_pm10: self.pm10(),
            temperature: self.temperature(),
            humidity: self.humidity(),
        }
    }

    fn any_dirty(&self) -> bool {
        self.co2_ppm.is_dirty()
            || self.pm2_5.is_dirty()
            || self.pm10.is_dirty()
            || self.temperature.is_dirty()
            || self.humidity.is_dirty()
    }

    /// Returns a snapshot if anything changed since the previous call.
    pub fn take_changes(&mut self) -> Option<AirQuality> {
        if !self.any_dirty() {
            return None;
        }

        self.co2_ppm.clear();
        self.pm2_5.clear();
        self.pm10.clear();
        self.temperature.clear();
        self.humidity.clear();
        Some(self.snapshot())
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn starts_at_zero() {
        let store = ReadingStore::new();
        assert_eq!(store.snapshot(), AirQuality::default());
    }

    #[test]
    fn same_value_notifies_once() {
        let mut store = ReadingStore::new();
        let mut changes = store.subscribe();

        let readings = [
            Reading::Co2Ppm(415),
            Reading::Pm2_5(1.5),
            Reading::Pm10(2.5),
            Reading::Temperature(21.25),
            Reading::Humidity(44.0),
        ];

        for reading in readings {
            assert!(store.update(reading));
            assert!(!store.update(reading));
        }

        for reading in readings {
            assert_eq!(changes.try_recv().unwrap(), reading);
        }
        assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn zero_is_not_a_change_from_the_initial_value() {
        let mut store = ReadingStore::new();
        assert!(!store.update(Reading::Co2Ppm(0)));
        assert!(!store.update(Reading::Humidity(0.0)));
    }

    #[test]
    fn float_noise_counts_as_change() {
        let mut store = ReadingStore::new();
        assert!(store.update(Reading::Temperature(25.0)));
        assert!(store.update(Reading::Temperature(25.000002)));
        assert_eq!(store.temperature(), 25.000002);
    }

    #[test]
    fn update_without_subscribers_still_stores() {
        let mut store = ReadingStore::new();
        assert!(store.update(Reading::Pm10(12.3)));
        assert_eq!(store.get(Quantity::Pm10), Reading::Pm10(12.3));
    }

    #[test]
    fn take_changes_clears_dirty_flags() {
        let mut store = ReadingStore::new();
        assert_eq!(store.take_changes(), None);

        store.update(Reading::Co2Ppm(600));
        let snapshot = store.take_changes().unwrap();
        assert_eq!(snapshot.co2_ppm, 600);
        assert_eq!(store.take_changes(), None);

        store.update(Reading::Co2Ppm(600));
        assert_eq!(store.take_changes(), None);
    }
}
