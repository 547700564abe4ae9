//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CaptureKind, DisplayKind, RigConfig, SensorKind};
use std::time::Duration;
use tracing::info;

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.config {
        info!(config = %path.display(), "Loading configuration");
    }
    let mut rig = load_config(args.config.as_deref())?;

    apply_overrides(&mut rig, args);
    config_loader::ConfigLoader::validate(&rig)
        .map_err(CliError::Config)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        eye = format!("{}x{}", rig.eye.eye_width, rig.eye.eye_height),
        ipd_m = rig.eye.ipd_m,
        capture = ?rig.capture.kind,
        sensor = ?rig.sensor.kind,
        display = ?rig.display.kind,
        layout = ?rig.display.layout,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&rig);
        return Ok(());
    }

    let session = Session::new(SessionConfig {
        rig,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");
    let stats = session.run(shutdown_signal()).await?;

    info!(
        frames_presented = stats.frames_presented,
        frames_dropped = stats.frames_dropped(),
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("VR desktop finished");
    Ok(())
}

/// Command-line flags replace the matching configuration sections
fn apply_overrides(rig: &mut RigConfig, args: &RunArgs) {
    if let Some(path) = &args.replay {
        info!(path = %path.display(), looping = args.replay_loop, "Replaying attitude log");
        rig.sensor.kind = SensorKind::Replay;
        rig.sensor.replay_path = Some(path.clone());
        rig.sensor.loop_replay = args.replay_loop;
    }
    if let Some(path) = &args.image {
        info!(path = %path.display(), "Showing still image");
        rig.capture.kind = CaptureKind::Image;
        rig.capture.image_path = Some(path.clone());
    }
    if let Some(dir) = &args.output_dir {
        info!(dir = %dir.display(), "Writing PNG snapshots");
        rig.display.kind = DisplayKind::Png;
        rig.display.output_dir = Some(dir.clone());
    }
    if let Some(ipd) = args.ipd {
        info!(ipd_m = ipd, "Overriding IPD from CLI");
        rig.eye.ipd_m = ipd;
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(rig: &RigConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Optics:");
    println!("  Eye buffer: {}x{}", rig.eye.eye_width, rig.eye.eye_height);
    println!("  IPD: {:.4} m, FOV: {:.1}°", rig.eye.ipd_m, rig.eye.fov_deg);
    println!(
        "  Desktop plane: {:.2} m wide at {:.2} m",
        rig.eye.screen_width_m, rig.eye.screen_distance_m
    );

    println!("\nCapture: {:?} {}x{} @ {} fps", rig.capture.kind, rig.capture.width, rig.capture.height, rig.capture.fps);
    if let Some(path) = &rig.capture.image_path {
        println!("  Image: {}", path.display());
    }

    println!("\nSensor: {:?} '{}' @ {} Hz", rig.sensor.kind, rig.sensor.source_id, rig.sensor.rate_hz);
    if let Some(path) = &rig.sensor.replay_path {
        println!("  Replay: {} (loop: {})", path.display(), rig.sensor.loop_replay);
    }

    println!("\nDisplay: {:?} ({:?})", rig.display.kind, rig.display.layout);
    if let Some(dir) = &rig.display.output_dir {
        println!("  Output: {}", dir.display());
    }

    println!(
        "\nPipeline: queue {} / timeout {} ms / stale after {} s",
        rig.pipeline.queue_capacity, rig.pipeline.stage_timeout_ms, rig.pipeline.staleness_threshold_s
    );
    println!();
}
