//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 传感器数据解析失败
    #[error("failed to parse sensor data from {source_id}: {message}")]
    ParseFailed {
        /// 传输源 ID
        source_id: String,
        /// 错误消息
        message: String,
    },

    /// 通道已关闭
    #[error("channel closed for source {source_id}")]
    ChannelClosed {
        /// 传输源 ID
        source_id: String,
    },

    /// 传输源已注册
    #[error("source {source_id} is already registered")]
    AlreadyRegistered {
        /// 传输源 ID
        source_id: String,
    },

    /// 配置不完整（缺少路径等）
    #[error("source {source_id} is misconfigured: {message}")]
    Misconfigured {
        /// 传输源 ID
        source_id: String,
        /// 错误消息
        message: String,
    },

    /// 图像解码失败
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        /// 文件路径
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// IO 错误
    #[error("io error on {path}: {source}")]
    Io {
        /// 文件路径
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl IngestionError {
    pub(crate) fn parse(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn misconfigured(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Misconfigured {
            source_id: source_id.into(),
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::ParseFailed { source_id, message } => {
                ContractError::invalid_sample(source_id, message)
            }
            IngestionError::ChannelClosed { source_id } => {
                ContractError::sensor_lost(source_id, "channel closed")
            }
            IngestionError::Misconfigured { source_id, message } => {
                ContractError::config_validation(source_id, message)
            }
            IngestionError::AlreadyRegistered { source_id } => {
                ContractError::config_validation(source_id, "already registered")
            }
            IngestionError::ImageDecode { path, source } => {
                ContractError::capture_lost(format!("{path}: {source}"))
            }
            IngestionError::Io { path, source } => {
                ContractError::capture_lost(format!("{path}: {source}"))
            }
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_transient() {
        let err: ContractError = IngestionError::parse("serial", "missing Roll").into();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("serial"));
    }

    #[test]
    fn test_closed_channel_is_fatal() {
        let err: ContractError = IngestionError::ChannelClosed {
            source_id: "imu".to_string(),
        }
        .into();
        assert!(err.is_fatal());
    }
}
