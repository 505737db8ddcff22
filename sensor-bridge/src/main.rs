use clap::Parser;
use linux_embedded_hal::Delay;
use log::{info, warn, LevelFilter};
use sensor_links::Sampler;
use tokio::sync::broadcast::error::RecvError;

mod args;
mod hardware;

use args::Args;
use hardware::{LinuxI2cBus, SerialOpener};

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.sensor_config()?;
    info!("{:?}", config);

    let mut sampler = Sampler::new(
        SerialOpener::new(&config.co2_port, config.co2_baud),
        SerialOpener::new(&config.dust_port, config.dust_baud),
        LinuxI2cBus::new(&config.i2c_bus),
        Delay,
        &config,
    );

    if args.json {
        let mut changes = sampler.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(reading) => match serde_json::to_string(&reading) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to encode {}: {}", reading, e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change printer fell behind, skipped {}", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    sampler.start();
    sampler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await;
    sampler.shutdown();

    Ok(())
}
