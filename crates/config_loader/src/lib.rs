//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `RigConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("rig.toml")).unwrap();
//! println!("IPD: {} m", config.eye.ipd_m);
//! ```

mod parser;
mod validator;

pub use contracts::RigConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format comes from the extension (.toml / .json), or from the content when
    /// there is none. Relative paths inside the file resolve against its directory.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RigConfig, ContractError> {
        let content = Self::read_file(path)?;
        let format = Self::detect_format(path, &content)?;

        let mut config = parser::parse(&content, format)?;
        if let Some(dir) = path.parent() {
            parser::resolve_paths(&mut config, dir);
        }
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RigConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &RigConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize RigConfig to TOML string
    pub fn to_toml(config: &RigConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RigConfig to JSON string
    pub fn to_json(config: &RigConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension, falling back to the content
    fn detect_format(path: &Path, content: &str) -> Result<ConfigFormat, ContractError> {
        match path.extension().and_then(|e| e.to_str()) {
            None => Ok(ConfigFormat::sniff(content)),
            Some(ext) => ConfigFormat::from_extension(ext).ok_or_else(|| {
                ContractError::config_parse(format!("unsupported config format: .{ext}"))
            }),
        }
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<RigConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[eye]
ipd_m = 0.063
fov_deg = 90.0
eye_width = 1080
eye_height = 1200
screen_distance_m = 2.0

[eye.left_lens]
k1 = 0.22
k2 = 0.24
center_offset_x = 0.05

[eye.right_lens]
k1 = 0.22
k2 = 0.24
center_offset_x = 0.05

[filter]
alpha = 0.98
max_dt_s = 0.5

[pipeline]
queue_capacity = 2
stage_timeout_ms = 50
staleness_threshold_s = 0.25

[display]
kind = "log"
layout = "side_by_side"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.eye.left_lens.center_offset_x, 0.05);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.eye, config2.eye);
        assert_eq!(config.filter, config2.filter);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.eye, config2.eye);
        assert_eq!(config.pipeline, config2.pipeline);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "[eye]\nipd_m = -0.01\n";
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ContractError::ConfigValidation { .. }
        ));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.eye.eye_height, 1200);
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported"), "got: {err}");
    }

    #[test]
    fn test_load_from_path_without_extension_sniffs_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "eye": { "eye_width": 640, "eye_height": 480 } }"#)
            .unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!((config.eye.eye_width, config.eye.eye_height), (640, 480));
    }

    #[test]
    fn test_load_from_path_resolves_replay_log_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.toml");
        std::fs::write(
            &path,
            "[sensor]\nkind = \"replay\"\nreplay_path = \"imu.log\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.sensor.replay_path, Some(dir.path().join("imu.log")));
    }
}
