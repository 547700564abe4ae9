//! Layered error definitions
//!
//! Categorized by how the pipeline reacts: config / transient data / resource loss

use thiserror::Error;

/// How the pipeline must react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Drop the offending sample or frame, keep running
    Transient,
    /// Reject the configuration, keep the previous one active
    Configuration,
    /// Stop the whole pipeline and report to the caller
    Fatal,
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transient Data Errors =====
    /// A single sensor sample was rejected
    #[error("invalid sample from '{source_id}': {message}")]
    InvalidSample { source_id: String, message: String },

    /// A captured frame could not be used
    #[error("malformed frame {frame_id}: {message}")]
    MalformedFrame { frame_id: u64, message: String },

    /// Stereo projection failed for one frame
    #[error("projection failed for frame {frame_id}: {message}")]
    Projection { frame_id: u64, message: String },

    /// Display sink failed to present one output
    #[error("display '{sink_name}' write error: {message}")]
    DisplayWrite { sink_name: String, message: String },

    // ===== Resource Failures =====
    /// Screen capture device is gone
    #[error("capture source lost: {message}")]
    CaptureLost { message: String },

    /// Sensor transport disconnected
    #[error("sensor transport '{source_id}' lost: {message}")]
    SensorLost { source_id: String, message: String },

    /// Display output is gone
    #[error("display '{sink_name}' lost: {message}")]
    DisplayLost { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid sample error
    pub fn invalid_sample(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSample {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create malformed frame error
    pub fn malformed_frame(frame_id: u64, message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            frame_id,
            message: message.into(),
        }
    }

    /// Create capture lost error
    pub fn capture_lost(message: impl Into<String>) -> Self {
        Self::CaptureLost {
            message: message.into(),
        }
    }

    /// Create sensor lost error
    pub fn sensor_lost(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorLost {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create display write error
    pub fn display_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DisplayWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create display lost error
    pub fn display_lost(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DisplayLost {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn severity(&self) -> Severity {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => Severity::Configuration,
            Self::InvalidSample { .. }
            | Self::MalformedFrame { .. }
            | Self::Projection { .. }
            | Self::DisplayWrite { .. }
            | Self::Other(_) => Severity::Transient,
            Self::CaptureLost { .. }
            | Self::SensorLost { .. }
            | Self::DisplayLost { .. }
            | Self::Io(_) => Severity::Fatal,
        }
    }

    /// Whether the pipeline must stop on this error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            ContractError::config_validation("eye.ipd_m", "must be > 0").severity(),
            Severity::Configuration
        );
        assert_eq!(
            ContractError::malformed_frame(3, "short buffer").severity(),
            Severity::Transient
        );
        assert!(ContractError::capture_lost("device unplugged").is_fatal());
        assert!(ContractError::sensor_lost("imu", "eof").is_fatal());
        assert!(!ContractError::display_write("png", "disk full").is_fatal());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = ContractError::config_validation("eye.fov_deg", "must be within (0, 180)");
        assert_eq!(
            err.to_string(),
            "config validation error at 'eye.fov_deg': must be within (0, 180)"
        );
    }
}
