//! Berth - Entry Point
//!
//! An ephemeral deployment service: an uploaded artifact becomes a container
//! image that runs as a time-boxed, network-reachable container and is
//! reclaimed when its lifetime ends.

use std::env;

use berth::app::run::run;
use berth::config::Settings;
use berth::logs::{init_logging, LogOptions};
use berth::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Print version and exit
    let args: Vec<String> = env::args().collect();
    if args.iter().skip(1).any(|arg| arg == "--version" || arg == "-V") {
        println!("{}", serde_json::to_string_pretty(&version_info()).unwrap());
        return;
    }

    // Read settings from the environment
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Run the service
    info!("Running berth with options: {:?}", settings.options);
    let result = run(settings.options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the service: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
