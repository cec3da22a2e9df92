//! # Celestium Application Entry Point
//!
//! Runs the engine against the built-in almanac. Modes:
//!
//! - `--stdout`: print one HUD frame and exit (development mode)
//! - `--json`: print one machine-readable reading and exit
//! - default: run the scheduler and redraw the HUD on every frame tick,
//!   with the rotation angle recomputed per frame, until Ctrl+C
//!
//! `--config <path>` overrides the default `celestium-config.toml`.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use celestium_lib::config::Config;
use celestium_lib::ephemeris::AlmanacProvider;
use celestium_lib::forecast::forecast;
use celestium_lib::geolocation::{acquire, FixedLocation, LocationOutcome, LocationSource, ModeController};
use celestium_lib::provider::AstronomyProvider;
use celestium_lib::renderer::{draw_ascii, render_ascii, HudView};
use celestium_lib::scheduler::{Cadence, Scheduler, Snapshot, SystemClock};
use celestium_lib::sector::sector_name;
use celestium_lib::vector::CelestialVector;
use celestium_lib::{CosmicEvent, GeoPosition, RotationMode, SolarState};
use chrono::{DateTime, Local, Utc};
use log::info;
use serde::Serialize;
use std::env;
use std::io::Write;
use std::sync::Arc;

/// One-shot reading printed by `--json`.
#[derive(Debug, Serialize)]
struct Reading {
    at: DateTime<Utc>,
    compact: String,
    full: String,
    solar: Option<SolarState>,
    sector: &'static str,
    lunar_phase: u8,
    rotation_deg: f64,
    mode: RotationMode,
    location: Option<GeoPosition>,
    next_event: Option<CosmicEvent>,
}

/// Command line switches.
#[derive(Debug, Default, PartialEq)]
struct Args {
    stdout: bool,
    json: bool,
    config: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut parsed = Args::default();
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout" => parsed.stdout = true,
            "--json" => parsed.json = true,
            "--config" => parsed.config = args.next(),
            other => log::warn!("Ignoring unknown argument {}", other),
        }
    }
    parsed
}

/// Acquire a location and settle the starting rotation mode.
async fn settle_location(config: &Config) -> ModeController {
    let source: Arc<dyn LocationSource> = Arc::new(FixedLocation::new(config.location.position()));
    let mut controller = ModeController::new(config.rotation.mode);

    let outcome = if config.location.position().is_some() || config.rotation.mode == RotationMode::TrueSolar {
        acquire(source, config.location.timeout()).await
    } else {
        LocationOutcome::Unavailable
    };
    controller.apply(outcome);
    controller
}

/// Single reading with a synchronous forecast run.
fn one_shot(provider: &dyn AstronomyProvider, config: &Config, controller: &ModeController, json: bool) -> anyhow::Result<()> {
    let now = Local::now();
    let utc = now.with_timezone(&Utc);
    let vector = CelestialVector::at(provider, &now, controller.mode(), controller.position());
    let run = forecast(provider, utc, controller.position(), &config.forecast);

    if json {
        let reading = Reading {
            at: utc,
            compact: vector.compact(),
            full: vector.full(),
            solar: vector.solar,
            sector: sector_name(vector.arc()),
            lunar_phase: vector.lunar_phase,
            rotation_deg: vector.rotation_deg,
            mode: controller.mode(),
            location: controller.position(),
            next_event: run.event,
        };
        println!("{}", serde_json::to_string_pretty(&reading).context("serialize reading")?);
    } else {
        draw_ascii(&HudView {
            vector: &vector,
            mode: controller.mode(),
            event: run.event.as_ref(),
            now: utc,
        });
    }
    Ok(())
}

/// One live HUD frame: the latest lane outputs plus this frame's rotation.
fn live_frame(snapshot: &Snapshot, rotation_deg: f64, mode: RotationMode, now: DateTime<Utc>) -> String {
    let vector = CelestialVector {
        solar: snapshot.solar,
        lunar_phase: snapshot.lunar_phase.unwrap_or(0),
        rotation_deg,
    };
    render_ascii(&HudView {
        vector: &vector,
        mode,
        event: snapshot.forecast.as_ref(),
        now,
    })
}

/// Run the scheduler until Ctrl+C, redrawing on every frame tick.
async fn run_live(provider: Arc<dyn AstronomyProvider>, config: &Config, controller: &ModeController) -> anyhow::Result<()> {
    let cadence = Cadence::from(&config.schedule);
    let mut scheduler = Scheduler::new(provider, Arc::new(SystemClock), config.forecast.clone(), cadence);
    scheduler.set_mode(controller.mode());
    scheduler.set_location(controller.position());
    scheduler.start();

    let snapshots = scheduler.subscribe();
    let mut frames = tokio::time::interval(cadence.frame);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    print!("\x1b[2J");

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("listen for Ctrl+C")?;
                info!("Shutting down");
                break;
            }
            _ = frames.tick() => {
                let now = Local::now();
                let rotation_deg = scheduler.frame(&now);
                let snapshot = snapshots.borrow().clone();
                let hud = live_frame(&snapshot, rotation_deg, scheduler.mode(), now.with_timezone(&Utc));
                // Home the cursor, draw, then clear whatever the last frame left below
                let mut stdout = std::io::stdout().lock();
                write!(stdout, "\x1b[H{}\x1b[J", hud)?;
                stdout.flush()?;
            }
        }
    }

    scheduler.shutdown();
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args());
    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    let provider: Arc<dyn AstronomyProvider> = Arc::new(AlmanacProvider::new());

    rt.block_on(async {
        let controller = settle_location(&config).await;
        info!(
            "Rotation mode {}, location {:?}",
            controller.mode(),
            controller.position()
        );

        if args.stdout || args.json {
            one_shot(provider.as_ref(), &config, &controller, args.json)
        } else {
            run_live(provider.clone(), &config, &controller).await
        }
    })
}
