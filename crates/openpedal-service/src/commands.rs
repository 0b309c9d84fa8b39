//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use openpedal_store::{CalibrationFiles, CurveStore, NoopCloudSync, SystemClock, curves_of};
use serde_json::json;
use tracing::warn;

use crate::cli::{CalibrationCommands, Commands, CurveCommands, DeviceCommands};
use crate::config::ServiceConfig;
use crate::service::{PedalService, RunOptions};

/// Dispatch one subcommand.
///
/// # Errors
///
/// Propagates the failure of the command.
pub async fn execute(command: &Commands, config: ServiceConfig) -> Result<()> {
    match command {
        Commands::Run { simulate, duration_secs } => {
            let options = RunOptions {
                simulate: *simulate,
                duration: duration_secs.map(Duration::from_secs),
            };
            run(config, options).await
        }
        Commands::Curves(cmd) => curves(cmd, &config).await,
        Commands::Calibration(CalibrationCommands::Show) => calibration_show(&config).await,
        Commands::Device(DeviceCommands::Info) => device_info(&config),
    }
}

async fn run(config: ServiceConfig, options: RunOptions) -> Result<()> {
    let service = PedalService::prepare(config, Arc::new(NoopCloudSync)).await?;
    service.run(options, ctrl_c()).await?;
    Ok(())
}

/// Resolves on Ctrl+C; never resolves when the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

async fn curves(command: &CurveCommands, config: &ServiceConfig) -> Result<()> {
    let layout = config.data_layout();
    let store = CurveStore::open(layout.clone(), config.cache_config(), Arc::new(SystemClock), SystemTime::now())
        .await
        .context("Failed to open curve store")?;

    match command {
        CurveCommands::List { pedal } => {
            let names = store.list_curves(*pedal).await;
            if names.is_empty() {
                println!("No curves stored for {pedal}");
                return Ok(());
            }
            println!("Curves for {pedal}:");
            for name in names {
                match modified(&layout.curve_file(*pedal, &name)).await {
                    Some(at) => println!("  {name:<24} {}", at.format("%Y-%m-%d %H:%M")),
                    None => println!("  {name}"),
                }
            }
        }
        CurveCommands::Show { pedal, name } => {
            let curve = store
                .load(*pedal, name)
                .await?
                .with_context(|| format!("No curve named '{name}' for {pedal}"))?;
            println!("{}", serde_json::to_string_pretty(&curve)?);
        }
        CurveCommands::Delete { pedal, name } => {
            store.delete(*pedal, name).await?;
            println!("Deleted {pedal} curve '{name}'");
        }
        CurveCommands::Seed => {
            let created = store.ensure_default_presets().await?;
            println!("Created {created} preset(s)");
        }
    }
    Ok(())
}

async fn modified(path: &Path) -> Option<DateTime<Local>> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    meta.modified().ok().map(DateTime::<Local>::from)
}

async fn calibration_show(config: &ServiceConfig) -> Result<()> {
    let files = CalibrationFiles::new(config.data_layout());
    let model = files.load_model().await.context("Failed to load calibration")?;
    let output = json!({
        "data_dir": files.layout().root(),
        "calibration": curves_of(&model),
        "axis_ranges": model.ranges(),
        "axis_mappings": model.mapping,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn device_info(config: &ServiceConfig) -> Result<()> {
    let device = &config.device;
    println!("Configured device: {}", device.identifier);
    println!("  VID:PID      {:04X}:{:04X}", device.vendor_id, device.product_id);
    println!("  Axes         {}", device.axis_count);
    println!("  Axis offset  {}", device.report_axis_offset);
    match &config.handbrake {
        Some(handbrake) => {
            println!("Handbrake device: {}", handbrake.identifier);
            println!("  VID:PID      {:04X}:{:04X}", handbrake.vendor_id, handbrake.product_id);
            println!("  Axis         {} of {}", handbrake.axis, handbrake.axis_count);
        }
        None => println!("Handbrake read from the pedal device"),
    }
    list_hid_devices(config)
}

#[cfg(feature = "hid")]
fn list_hid_devices(config: &ServiceConfig) -> Result<()> {
    let devices = openpedal_device::list_devices().context("Failed to enumerate HID devices")?;
    println!("Attached HID devices:");
    for dev in devices {
        let id = (dev.vendor_id, dev.product_id);
        let marker = if id == (config.device.vendor_id, config.device.product_id) {
            "*"
        } else if config
            .handbrake
            .as_ref()
            .is_some_and(|handbrake| id == (handbrake.vendor_id, handbrake.product_id))
        {
            "h"
        } else {
            " "
        };
        println!(
            "{marker} {:04X}:{:04X} {} {}",
            dev.vendor_id,
            dev.product_id,
            dev.manufacturer.as_deref().unwrap_or("-"),
            dev.product.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

#[cfg(not(feature = "hid"))]
fn list_hid_devices(_config: &ServiceConfig) -> Result<()> {
    println!("Built without HID support; attached devices cannot be listed");
    Ok(())
}
