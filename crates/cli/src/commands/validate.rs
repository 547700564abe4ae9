//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DisplayKind, RigConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    eye_resolution: String,
    capture: String,
    sensor: String,
    display: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(rig) => {
            let warnings = collect_warnings(&rig);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", rig.version),
                    eye_resolution: format!("{}x{}", rig.eye.eye_width, rig.eye.eye_height),
                    capture: format!("{:?}", rig.capture.kind),
                    sensor: format!("{:?}", rig.sensor.kind),
                    display: format!("{:?} ({:?})", rig.display.kind, rig.display.layout),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(rig: &RigConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let sample_interval = 1.0 / rig.sensor.rate_hz;
    if rig.pipeline.staleness_threshold_s < 2.0 * sample_interval {
        warnings.push(format!(
            "pipeline.staleness_threshold_s ({} s) is under two sensor intervals ({:.3} s) - frames will often be tagged stale",
            rig.pipeline.staleness_threshold_s,
            2.0 * sample_interval
        ));
    }

    if rig.pipeline.queue_capacity > 4 {
        warnings.push(format!(
            "pipeline.queue_capacity = {} adds up to {} frames of latency per queue",
            rig.pipeline.queue_capacity, rig.pipeline.queue_capacity
        ));
    }

    if rig.eye.left_lens != rig.eye.right_lens {
        warnings.push("left and right lens coefficients differ".to_string());
    }

    if rig.eye.eye_width > rig.capture.width || rig.eye.eye_height > rig.capture.height {
        warnings.push(format!(
            "eye buffer {}x{} is larger than the capture {}x{} - the desktop will be upsampled",
            rig.eye.eye_width, rig.eye.eye_height, rig.capture.width, rig.capture.height
        ));
    }

    if rig.display.kind == DisplayKind::Png && rig.display.every_nth == 1 {
        warnings.push("display.every_nth = 1 writes a PNG for every presented frame".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Eye buffer: {}", summary.eye_resolution);
            println!("  Capture: {}", summary.capture);
            println!("  Sensor: {}", summary.sensor);
            println!("  Display: {}", summary.display);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
