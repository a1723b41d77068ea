use anyhow::{bail, Context, Result};
use power_monitor::{
    config::AppConfig,
    observability,
    transform::{decode_property, extract_power},
};

/// Print every device and appliance visible to the configured token, with
/// decoded smart meter properties.
fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let client = cfg.build_client()?;

    let devices = client.devices().context("failed to fetch devices")?;
    if devices.is_empty() {
        bail!("no devices found for this access token");
    }
    println!("Found {} device(s)", devices.len());
    for d in &devices {
        println!(
            "  - Device: {} (ID: {}, firmware: {})",
            d.name,
            d.id,
            d.firmware_version.as_deref().unwrap_or("unknown")
        );
    }

    // IR appliances are informational only.
    match client.appliances() {
        Ok(appliances) => {
            println!("\nFound {} appliance(s)", appliances.len());
            for a in &appliances {
                println!("  - {} (Type: {})", a.nickname, a.kind);
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to fetch appliances"),
    }

    let echonet = client
        .echonetlite_appliances()
        .context("failed to fetch ECHONET Lite appliances")?;
    if echonet.is_empty() {
        println!("\nNo ECHONET Lite appliances found");
        return Ok(());
    }

    println!("\nFound {} ECHONET Lite appliance(s)", echonet.len());
    for a in &echonet {
        println!("\n  Appliance: {} (Type: {}, ID: {})", a.nickname, a.kind, a.id);
        if a.properties.is_empty() {
            continue;
        }
        println!("  Electricity Data:");
        for p in &a.properties {
            match decode_property(p) {
                Ok(decoded) => println!("    {decoded}"),
                Err(e) => println!("    EPC {}: {} (could not parse: {e})", p.epc, p.val),
            }
        }
        if let Ok(reading) = extract_power(a) {
            println!("  Monitorable: yes ({} W as of {})", reading.power_watts, reading.updated_at);
        }
    }

    Ok(())
}
