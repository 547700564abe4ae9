//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{LensCoefficients, RigConfig};
use serde::Serialize;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    optics: OpticsInfo,
    pipeline: PipelineInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    lenses: Option<LensInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<FilterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<SourcesInfo>,
}

#[derive(Serialize)]
struct OpticsInfo {
    ipd_m: f64,
    fov_deg: f64,
    eye_width: u32,
    eye_height: u32,
    screen_distance_m: f64,
    screen_width_m: f64,
    roll_mode: String,
}

#[derive(Serialize)]
struct PipelineInfo {
    queue_capacity: usize,
    stage_timeout_ms: u64,
    staleness_threshold_s: f64,
}

#[derive(Serialize)]
struct LensInfo {
    left: LensCoefficients,
    right: LensCoefficients,
}

#[derive(Serialize)]
struct FilterInfo {
    alpha: f64,
    max_dt_s: f64,
    attitude_smoothing: f64,
    history_capacity: usize,
    mount_offset_deg: [f64; 3],
}

#[derive(Serialize)]
struct SourcesInfo {
    capture: String,
    sensor: String,
    display: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let rig = load_config(args.config.as_deref())?;

    if args.json {
        let info = build_config_info(&rig, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&rig, args);
    }

    Ok(())
}

fn capture_desc(rig: &RigConfig) -> String {
    let capture = &rig.capture;
    let mut desc = format!(
        "{:?} {}x{} @ {} fps",
        capture.kind, capture.width, capture.height, capture.fps
    );
    if let Some(path) = &capture.image_path {
        desc.push_str(&format!(" ({})", path.display()));
    }
    desc
}

fn sensor_desc(rig: &RigConfig) -> String {
    let sensor = &rig.sensor;
    let mut desc = format!("{:?} '{}' @ {} Hz", sensor.kind, sensor.source_id, sensor.rate_hz);
    if let Some(path) = &sensor.replay_path {
        desc.push_str(&format!(" ({})", path.display()));
    }
    desc
}

fn display_desc(rig: &RigConfig) -> String {
    let display = &rig.display;
    let mut desc = format!("{:?} ({:?}), every_nth={}", display.kind, display.layout, display.every_nth);
    if let Some(dir) = &display.output_dir {
        desc.push_str(&format!(" -> {}", dir.display()));
    }
    desc
}

fn build_config_info(rig: &RigConfig, args: &InfoArgs) -> ConfigInfo {
    let eye = &rig.eye;
    let filter = &rig.filter;

    ConfigInfo {
        version: format!("{:?}", rig.version),
        optics: OpticsInfo {
            ipd_m: eye.ipd_m,
            fov_deg: eye.fov_deg,
            eye_width: eye.eye_width,
            eye_height: eye.eye_height,
            screen_distance_m: eye.screen_distance_m,
            screen_width_m: eye.screen_width_m,
            roll_mode: format!("{:?}", eye.roll_mode),
        },
        pipeline: PipelineInfo {
            queue_capacity: rig.pipeline.queue_capacity,
            stage_timeout_ms: rig.pipeline.stage_timeout_ms,
            staleness_threshold_s: rig.pipeline.staleness_threshold_s,
        },
        lenses: args.optics.then(|| LensInfo {
            left: eye.left_lens,
            right: eye.right_lens,
        }),
        filter: args.optics.then(|| FilterInfo {
            alpha: filter.alpha,
            max_dt_s: filter.max_dt_s,
            attitude_smoothing: filter.attitude_smoothing,
            history_capacity: filter.history_capacity,
            mount_offset_deg: [
                filter.mount_offset_deg.yaw,
                filter.mount_offset_deg.pitch,
                filter.mount_offset_deg.roll,
            ],
        }),
        sources: args.sources.then(|| SourcesInfo {
            capture: capture_desc(rig),
            sensor: sensor_desc(rig),
            display: display_desc(rig),
        }),
    }
}

fn print_config_info(rig: &RigConfig, args: &InfoArgs) {
    let eye = &rig.eye;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               VR Desktop Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("👓 Optics");
    println!("   ├─ Version: {:?}", rig.version);
    println!("   ├─ Eye buffer: {}x{}", eye.eye_width, eye.eye_height);
    println!("   ├─ IPD: {:.4} m", eye.ipd_m);
    println!("   ├─ FOV: {:.1}°", eye.fov_deg);
    println!(
        "   ├─ Desktop plane: {:.2} m wide at {:.2} m",
        eye.screen_width_m, eye.screen_distance_m
    );
    if args.optics {
        println!("   ├─ Roll: {:?}", eye.roll_mode);
        for (name, lens) in [("Left lens", &eye.left_lens), ("Right lens", &eye.right_lens)] {
            println!(
                "   ├─ {}: k1={} k2={} centre={}",
                name, lens.k1, lens.k2, lens.center_offset_x
            );
        }
        let filter = &rig.filter;
        println!(
            "   └─ Filter: α={} max Δt={} s, attitude smoothing {}",
            filter.alpha, filter.max_dt_s, filter.attitude_smoothing
        );
    } else {
        println!("   └─ Roll: {:?}", eye.roll_mode);
    }

    println!("\n⚙️  Pipeline");
    println!("   ├─ Queue capacity: {}", rig.pipeline.queue_capacity);
    println!("   ├─ Stage timeout: {} ms", rig.pipeline.stage_timeout_ms);
    println!("   └─ Stale after: {} s", rig.pipeline.staleness_threshold_s);

    if args.sources {
        println!("\n📡 Sources");
        println!("   ├─ Capture: {}", capture_desc(rig));
        println!("   ├─ Sensor: {}", sensor_desc(rig));
        println!("   └─ Display: {}", display_desc(rig));
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_follow_flags() {
        let rig = RigConfig::default();
        let brief = build_config_info(
            &rig,
            &InfoArgs {
                config: None,
                json: true,
                optics: false,
                sources: false,
            },
        );
        let json = serde_json::to_value(&brief).unwrap();
        assert!(json.get("lenses").is_none());
        assert!(json.get("sources").is_none());
        assert_eq!(json["optics"]["eye_width"], rig.eye.eye_width);

        let full = build_config_info(
            &rig,
            &InfoArgs {
                config: None,
                json: true,
                optics: true,
                sources: true,
            },
        );
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["filter"]["alpha"], 0.98);
        assert!(json["sources"]["sensor"].as_str().unwrap().starts_with("Mock"));
    }
}
