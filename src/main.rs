//! Aquamon firmware: main entry point.
//!
//! Hexagonal architecture: one blocking control loop behind port traits.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspHardware / SimHardware   SystemClock     LogEventSink      │
//! │  (HardwarePort)              (ClockPort)     (EventSink)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  Sensors · Threshold · Alert · Pump · Feeder · Safety  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Watchdog (per iteration) · CancelToken (Ctrl-C / stop)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the host, `AQUAMON_CONFIG` names a JSON config file and
//! `AQUAMON_PRESET` selects a built-in preset.  Lines typed on stdin
//! (`feed`, `stop`, `resume`) become operator commands.
#![deny(unused_must_use)]

use std::sync::mpsc;

use anyhow::{Context, Result};
use log::{info, warn};

use aquamon::adapters::log_sink::LogEventSink;
use aquamon::adapters::time::SystemClock;
use aquamon::app::commands::AppCommand;
use aquamon::app::service::ControlLoop;
use aquamon::cancel::CancelToken;
use aquamon::config::SystemConfig;
use aquamon::drivers::watchdog::Watchdog;

#[cfg(not(target_os = "espidf"))]
use aquamon::adapters::hardware::SimHardware;
#[cfg(target_os = "espidf")]
use aquamon::adapters::hardware::EspHardware;

const CONFIG_ENV: &str = "AQUAMON_CONFIG";
const PRESET_ENV: &str = "AQUAMON_PRESET";

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    init_logging()?;
    info!("Aquamon v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;

    // ── 3. Stop request and operator commands ─────────────────
    let token = CancelToken::new();
    let (tx, rx) = mpsc::channel::<AppCommand>();
    #[cfg(not(target_os = "espidf"))]
    {
        install_ctrl_c(token.clone())?;
        spawn_command_reader(tx)?;
    }
    #[cfg(target_os = "espidf")]
    drop(tx);

    // ── 4. Peripherals ────────────────────────────────────────
    let watchdog = Watchdog::new(config.longest_step());
    let hw = board(&config)?;

    // ── 5. Control loop ───────────────────────────────────────
    let mut control = ControlLoop::new(&config, hw, SystemClock::new(), LogEventSink::new())
        .context("control loop init failed")?;

    control.run_with(&token, |lp| {
        watchdog.feed();
        while let Ok(cmd) = rx.try_recv() {
            if let Err(e) = lp.handle_command(cmd) {
                warn!("Command {:?} rejected: {}", cmd, e);
            }
        }
    });

    info!(
        "Stopped after {} cycle(s), {} watchdog feed(s)",
        control.cycles(),
        watchdog.feeds()
    );
    Ok(())
}

// ── Bootstrap helpers ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_logging() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    Ok(())
}

/// Config file, then named preset, then the default preset.
#[cfg(not(target_os = "espidf"))]
fn load_config() -> Result<SystemConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let json =
            std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let config =
            SystemConfig::from_json(&json).with_context(|| format!("loading {path}"))?;
        info!("Config loaded from {}", path);
        return Ok(config);
    }
    match std::env::var(PRESET_ENV) {
        Ok(name) => {
            let config = SystemConfig::preset(&name).with_context(|| {
                format!("unknown preset '{name}' (water_quality, pump_station, fish_feeder)")
            })?;
            info!("Preset '{}'", name);
            Ok(config)
        }
        Err(_) => {
            info!("No {} or {}; using water_quality preset", CONFIG_ENV, PRESET_ENV);
            Ok(SystemConfig::default())
        }
    }
}

/// The board has no filesystem: a preset is chosen at build time.
#[cfg(target_os = "espidf")]
fn load_config() -> Result<SystemConfig> {
    let _ = CONFIG_ENV;
    let name = option_env!("AQUAMON_PRESET").unwrap_or("water_quality");
    let config = SystemConfig::preset(name)
        .with_context(|| format!("unknown {PRESET_ENV} '{name}' baked into firmware"))?;
    config.validate().context("preset rejected")?;
    info!("Preset '{}'", name);
    Ok(config)
}

#[cfg(not(target_os = "espidf"))]
fn board(config: &SystemConfig) -> Result<SimHardware> {
    info!("Host build: simulated board with nominal readings");
    Ok(SimHardware::nominal(config))
}

#[cfg(target_os = "espidf")]
fn board(config: &SystemConfig) -> Result<EspHardware> {
    let adc: heapless::Vec<u8, 2> = [&config.sensors.ph, &config.sensors.level]
        .into_iter()
        .filter(|s| s.enabled)
        .map(|s| s.channel)
        .collect();
    EspHardware::new(&adc).map_err(|e| anyhow::anyhow!("peripheral init: {e}"))
}

/// Ctrl-C cancels the token from a helper thread running a single-task
/// runtime; the control loop notices within one sleep slice.
#[cfg(not(target_os = "espidf"))]
fn install_ctrl_c(token: CancelToken) -> Result<()> {
    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("Ctrl-C handler unavailable: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl-C received, stopping");
                        token.cancel();
                    }
                    Err(e) => warn!("Ctrl-C handler failed: {}", e),
                }
            });
        })
        .context("spawning signal thread")?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn spawn_command_reader(tx: mpsc::Sender<AppCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<AppCommand>() {
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("'{}': {}", line.trim(), e),
                }
            }
        })
        .context("spawning console thread")?;
    Ok(())
}
