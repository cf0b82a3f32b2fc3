mod config;
mod imu;
mod servo;
mod system;
mod web_server;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use config::SystemConfig;
use imu::SimulatedImu;
use log::info;
use servo::ServoBank;
use suspension_core::{
    ConfigChannel, ConfigState, JsonFileStore, ParameterStore, SuspensionController,
};
use system::ControlLoop;
use web_server::ConfigServer;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = SystemConfig::from_env();

    info!("=== Four-Corner Suspension Rig ===");
    info!(
        "HTTP: {}, params: {}, period: {} ms",
        config.network.http_addr,
        config.storage.params_path.display(),
        config.control.period.as_millis()
    );

    // Saved parameters, or firmware defaults if missing/corrupt
    let store = JsonFileStore::new(&config.storage.params_path);
    let params = store.load_or_default();
    info!(
        "Suspension travel {:.1}..{:.1} around rest {:.1}",
        params.travel_limits().travel_min,
        params.travel_limits().travel_max,
        params.rest_offset
    );

    let state = Arc::new(ConfigState::new(params));
    let channel = Arc::new(ConfigChannel::new(state.clone(), store));

    let server = ConfigServer::start(&config.network.http_addr, channel)
        .context("starting configuration server")?;
    info!("Tuning page at http://{}/", server.local_addr());

    let start = Instant::now();
    let imu = SimulatedImu::new(&config.imu, start);
    let servos = ServoBank::new(params.total_range, params.rest_offset);
    let mut control = ControlLoop::new(
        SuspensionController::new(params),
        imu,
        servos,
        state,
        &config,
        start,
    );

    // Runs for the life of the process
    let running = AtomicBool::new(true);
    control.run(&running);

    Ok(())
}
