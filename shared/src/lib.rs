#![cfg_attr(not(test), no_std)]

use core::fmt;

/// One of the physical quantities reported by the sensor core.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// CO2 concentration from the NDIR analyzer [ppm]
    Co2,
    /// Mass Concentration PM2.5 [μg/m³]
    Pm2_5,
    /// Mass Concentration PM10 [μg/m³]
    Pm10,
    /// Ambient temperature [°C]
    Temperature,
    /// Relative humidity [%RH]
    Humidity,
}

impl Quantity {
    pub const ALL: [Quantity; 5] = [
        Quantity::Co2,
        Quantity::Pm2_5,
        Quantity::Pm10,
        Quantity::Temperature,
        Quantity::Humidity,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Quantity::Co2 => "co2",
            Quantity::Pm2_5 => "pm2.5",
            Quantity::Pm10 => "pm10",
            Quantity::Temperature => "temperature",
            Quantity::Humidity => "humidity",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Quantity::Co2 => "ppm",
            Quantity::Pm2_5 | Quantity::Pm10 => "μg/m³",
            Quantity::Temperature => "°C",
            Quantity::Humidity => "%RH",
        }
    }
}

/// A single validated value, tagged with the quantity it belongs to.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Co2Ppm(u16),
    Pm2_5(f32),
    Pm10(f32),
    Temperature(f32),
    Humidity(f32),
}

impl Reading {
    pub const fn quantity(&self) -> Quantity {
        match self {
            Reading::Co2Ppm(_) => Quantity::Co2,
            Reading::Pm2_5(_) => Quantity::Pm2_5,
            Reading::Pm10(_) => Quantity::Pm10,
            Reading::Temperature(_) => Quantity::Temperature,
            Reading::Humidity(_) => Quantity::Humidity,
        }
    }

    /// The value widened to `f32`, for consumers that treat all quantities alike.
    pub fn as_f32(&self) -> f32 {
        match *self {
            Reading::Co2Ppm(ppm) => ppm as f32,
            Reading::Pm2_5(v)
            | Reading::Pm10(v)
            | Reading::Temperature(v)
            | Reading::Humidity(v) => v,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantity = self.quantity();
        match self {
            Reading::Co2Ppm(ppm) => write!(f, "{} {} {}", quantity.name(), ppm, quantity.unit()),
            _ => write!(
                f,
                "{} {:.1} {}",
                quantity.name(),
                self.as_f32(),
                quantity.unit()
            ),
        }
    }
}

/// Last known value of every quantity.
#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq, Default, Clone, Copy)]
pub struct AirQuality {
    pub co2_ppm: u16,
    /// Mass Concentration PM2.5 [μg/m³]
    pub mass_pm2_5: f32,
    /// Mass Concentration PM10 [μg/m³]
    pub mass_pm10: f32,
    pub temperature: f32,
    pub humidity: f32,
}

impl AirQuality {
    pub fn get(&self, quantity: Quantity) -> Reading {
        match quantity {
            Quantity::Co2 => Reading::Co2Ppm(self.co2_ppm),
            Quantity::Pm2_5 => Reading::Pm2_5(self.mass_pm2_5),
            Quantity::Pm10 => Reading::Pm10(self.mass_pm10),
            Quantity::Temperature => Reading::Temperature(self.temperature),
            Quantity::Humidity => Reading::Humidity(self.humidity),
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "co2 {} ppm, pm2.5 {:.1}, pm10 {:.1}, {:.2} °C, {:.2} %RH",
            self.co2_ppm, self.mass_pm2_5, self.mass_pm10, self.temperature, self.humidity
        )
    }
}
