//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// VR Desktop - view the desktop in a headset with head tracking
#[derive(Parser, Debug)]
#[command(
    name = "vr-desktop",
    author,
    version,
    about = "Stereoscopic desktop viewer with IMU head tracking",
    long_about = "Captures the desktop, fuses IMU samples into a head orientation and \n\
                  renders a lens-corrected stereo pair for a headset display.\n\n\
                  Without a configuration file every collaborator is simulated."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "VR_DESKTOP_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "VR_DESKTOP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture → project → display pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults are used when omitted
    #[arg(short, long, env = "VR_DESKTOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Replay an attitude log (`Yaw: .., Pitch: .., Roll: ..` lines) instead of the configured sensor
    #[arg(long, env = "VR_DESKTOP_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Restart the replay log at EOF
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,

    /// Show a still image instead of the configured capture source
    #[arg(long, env = "VR_DESKTOP_IMAGE")]
    pub image: Option<PathBuf>,

    /// Write PNG snapshots to this directory instead of the configured display
    #[arg(long, env = "VR_DESKTOP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override the interpupillary distance (metres)
    #[arg(long)]
    pub ipd: Option<f64>,

    /// Maximum number of presented frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "VR_DESKTOP_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run time limit in seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "VR_DESKTOP_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "VR_DESKTOP_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults are shown when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show lens and filter details
    #[arg(long)]
    pub optics: bool,

    /// Show capture, sensor and display sources
    #[arg(long)]
    pub sources: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "vr-desktop",
            "-v",
            "run",
            "--replay",
            "head.log",
            "--replay-loop",
            "--ipd",
            "0.064",
            "--max-frames",
            "120",
        ])
        .unwrap();
        assert_eq!(cli.default_log_level(), "debug");

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.replay, Some(PathBuf::from("head.log")));
        assert!(args.replay_loop);
        assert_eq!(args.ipd, Some(0.064));
        assert_eq!(args.max_frames, 120);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_replay_loop_requires_replay() {
        assert!(Cli::try_parse_from(["vr-desktop", "run", "--replay-loop"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["vr-desktop", "-q", "-v", "info"]).is_err());
        let cli = Cli::try_parse_from(["vr-desktop", "-q", "info"]).unwrap();
        assert_eq!(cli.default_log_level(), "warn");
    }
}
