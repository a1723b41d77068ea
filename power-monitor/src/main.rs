use anyhow::{bail, Context, Result};
use power_monitor::{
    config::AppConfig,
    metrics_server,
    observability,
    scheduler::Scheduler,
    shutdown::Shutdown,
    sinks::ConsoleSink,
    sources::{discover_meter, NatureRemoSource},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::start(metrics_cfg).await?;
    }

    let client = cfg.build_client()?;

    // Connectivity check: the token must see at least one device.
    let devices = {
        let client = client.clone();
        tokio::task::spawn_blocking(move || client.devices()).await?
    }
    .context("failed to fetch devices")?;
    if devices.is_empty() {
        bail!("no devices found for this access token");
    }
    for d in &devices {
        tracing::info!(device = %d.name, id = %d.id, "device found");
    }

    let appliances = {
        let client = client.clone();
        tokio::task::spawn_blocking(move || client.echonetlite_appliances()).await?
    }
    .context("failed to fetch ECHONET Lite appliances")?;

    let meter = discover_meter(&appliances, cfg.monitor.appliance_id.as_deref())
        .context("no smart meter reporting instantaneous power was found")?;
    tracing::info!(meter = %meter.nickname, id = %meter.id, "monitoring smart meter");

    let shutdown = Shutdown::new();
    shutdown.install_ctrl_c();

    let source = NatureRemoSource::new(client, meter.id.clone());
    let scheduler = Scheduler::new(source, ConsoleSink, cfg.schedule.clone());
    scheduler.run(&shutdown).await?;

    Ok(())
}
