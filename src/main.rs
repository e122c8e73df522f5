use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, error, info};

use crate::bridge::BridgeContext;
use crate::config::BridgeConfig;
use crate::config::cli::Cli;
use crate::engine::geometric::GeometricEngine;
use crate::server::BridgeServer;
use crate::server::port::reclaim_port;

mod bridge;
mod config;
mod engine;
mod server;

fn init_logging(config: &BridgeConfig) {
    let crate_level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("raytrace_bridge"), crate_level)
        .parse_default_env()
        .init();
}

fn run(config: BridgeConfig) -> anyhow::Result<()> {
    if config.reclaim_port {
        reclaim_port(config.port);
    }

    let engine = GeometricEngine::from_file(&config.scene, config.frequency, &config.device)
        .with_context(|| format!("Loading scene {}", config.scene))?;
    let context = BridgeContext::new(engine, &config);

    let address = config.bind_address();
    let server = BridgeServer::bind(&address, context).with_context(|| format!("Binding UDP socket on {}", address))?;

    info!("Setup complete. Working at {} GHz, bandwidth {} MHz.", config.frequency / 1e9, config.bandwidth / 1e6);
    info!("Listening on {}", address);
    server.run()
}

fn main() {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(2);
        }
    };

    init_logging(&config);
    info!("Starting up");

    if let Err(err) = run(config) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
