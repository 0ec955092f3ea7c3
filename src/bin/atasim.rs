use atasim::config::{ConfigError, SimulatorConfig};
use atasim::{selftest, server};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = match SimulatorConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(ConfigError::Info(text)) => {
            println!("{text}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if config.self_test {
        let report = selftest::run();
        if report.is_success() {
            info!("✅ all {} self-checks passed", report.passed);
        } else {
            error!("{} self-checks failed", report.failures.len());
        }
        // Historical behaviour: the self-check always exits with status 1.
        process::exit(1);
    }

    println!("📡 ATA Control Interface Simulator");
    println!("==================================");
    info!(
        "command port {}, status port {}",
        config.command_port, config.status_port
    );

    server::run(&config).await?;
    Ok(())
}
