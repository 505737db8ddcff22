use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use sensor_links::SensorConfig;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file with sensor settings. Flags below override its values.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// CO2 analyzer UART [default: /dev/ttyUSB0]
    #[clap(long)]
    pub co2_port: Option<String>,
    /// [default: 9600]
    #[clap(long)]
    pub co2_baud: Option<u32>,
    /// Dust sensor UART [default: /dev/ttyUSB1]
    #[clap(long)]
    pub dust_port: Option<String>,
    /// [default: 9600]
    #[clap(long)]
    pub dust_baud: Option<u32>,
    /// I2C bus device of the SHTC3 [default: /dev/i2c-1]
    #[clap(long)]
    pub i2c_bus: Option<String>,
    /// 7-bit SHTC3 address, hex or decimal [default: 0x70]
    #[clap(long, value_parser = parse_address)]
    pub i2c_address: Option<u8>,
    /// [default: 5000]
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,
    /// SHTC3 conversion wait [default: 15]
    #[clap(long)]
    pub conversion_delay_ms: Option<u32>,
    /// Print every change as a JSON line on stdout
    #[clap(long)]
    pub json: bool,
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long)]
    pub verbose: bool,
}

fn parse_address(raw: &str) -> Result<u8, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    match parsed {
        Ok(address) if address <= 0x7f => Ok(address),
        Ok(address) => Err(format!("{:#x} is not a 7-bit address", address)),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    pub fn sensor_config(&self) -> eyre::Result<SensorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .wrap_err_with(|| format!("parsing {}", path.display()))?
            }
            None => SensorConfig::default(),
        };
        self.apply(&mut config);

        if config.poll_interval_ms == 0 {
            eyre::bail!("poll interval must be at least 1 ms");
        }
        Ok(config)
    }

    fn apply(&self, config: &mut SensorConfig) {
        if let Some(port) = &self.co2_port {
            config.co2_port = port.clone();
        }
        if let Some(baud) = self.co2_baud {
            config.co2_baud = baud;
        }
        if let Some(port) = &self.dust_port {
            config.dust_port = port.clone();
        }
        if let Some(baud) = self.dust_baud {
            config.dust_baud = baud;
        }
        if let Some(bus) = &self.i2c_bus {
            config.i2c_bus = bus.clone();
        }
        if let Some(address) = self.i2c_address {
            config.i2c_address = address;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(delay) = self.conversion_delay_ms {
            config.conversion_delay_ms = delay;
        }
    }
}
