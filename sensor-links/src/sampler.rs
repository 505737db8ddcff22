//! The control loop: one task, one interval, two UART read branches.
//!
//! Every tick writes a CO2 request and runs a full SHTC3 transaction. The
//! transaction's conversion delay is a short blocking stall on this task.
//! Dust data is never polled; it is parsed as soon as it arrives.

use std::future::Future;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::info;
use shared::Reading;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::co2::Co2Link;
use crate::config::SensorConfig;
use crate::dust::DustLink;
use crate::serial::SerialOpen;
use crate::shtc3::{I2cBusOpen, TempHumidityLink};
use crate::store::ReadingStore;

const CO2_READ_BUFFER: usize = 64;
const DUST_READ_BUFFER: usize = 256;

pub struct Sampler<S, I, D>
where
    S: SerialOpen,
    I: I2cBusOpen,
    D: DelayNs,
{
    co2: Co2Link<S>,
    dust: DustLink<S>,
    climate: TempHumidityLink<I, D>,
    store: ReadingStore,
    poll_interval: Duration,
}

impl<S, I, D> Sampler<S, I, D>
where
    S: SerialOpen,
    I: I2cBusOpen,
    D: DelayNs,
{
    pub fn new(co2: S, dust: S, i2c: I, delay: D, config: &SensorConfig) -> Self {
        Self {
            co2: Co2Link::new(co2),
            dust: DustLink::new(dust),
            climate: TempHumidityLink::new(i2c, delay)
                .with_address(config.i2c_address)
                .with_conversion_delay_ms(config.conversion_delay_ms),
            store: ReadingStore::new(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.store.subscribe()
    }

    /// Opens the dust port. Failure is not fatal; the next tick retries.
    pub fn start(&mut self) {
        info!(
            "Starting sensor sampling every {} ms",
            self.poll_interval.as_millis()
        );
        self.dust.ensure_open();
    }

    /// One poll: CO2 request, then the SHTC3 transaction.
    pub async fn tick(&mut self) {
        if !self.dust.is_open() {
            self.dust.ensure_open();
        }

        self.co2.request().await;
        self.climate.poll(&mut self.store);

        if let Some(snapshot) = self.store.take_changes() {
            info!("{}", snapshot);
        }
    }

    /// Runs until `shutdown` completes. The first poll happens immediately.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut co2_buffer = [0u8; CO2_READ_BUFFER];
        let mut dust_buffer = [0u8; DUST_READ_BUFFER];

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => self.tick().await,
                result = self.co2.read(&mut co2_buffer) => {
                    self.co2.on_read(result, &co2_buffer, &mut self.store);
                }
                result = self.dust.read(&mut dust_buffer) => {
                    self.dust.on_read(result, &dust_buffer, &mut self.store);
                }
            }
        }
    }

    /// Closes both UARTs. The I2C bus is never held between ticks.
    pub fn shutdown(&mut self) {
        self.co2.close();
        self.dust.close();
        info!("Sensor sampling stopped");
    }
}
