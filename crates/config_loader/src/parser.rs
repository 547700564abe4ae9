//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。
//! 文件中的相对路径 (回放日志 / 静态图像 / PNG 输出目录) 以配置文件所在目录为基准。

use std::path::{Path, PathBuf};

use contracts::{ContractError, RigConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 无扩展名时按内容猜测：以 `{` 开头视为 JSON，其余按 TOML
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Toml
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RigConfig, ContractError> {
    let parsed = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(boxed),
        ConfigFormat::Json => serde_json::from_str(content).map_err(boxed),
    };
    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("{} parse error: {e}", format.name()),
        source: Some(e),
    })
}

fn boxed<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

/// 把相对路径改为相对 `base` 目录
pub fn resolve_paths(config: &mut RigConfig, base: &Path) {
    let fields: [&mut Option<PathBuf>; 3] = [
        &mut config.sensor.replay_path,
        &mut config.capture.image_path,
        &mut config.display.output_dir,
    ];
    for path in fields.into_iter().flatten() {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}
