//! 配置校验模块
//!
//! 校验规则：
//! - eye / filter / pipeline 数值范围 (validator derive)
//! - 所有浮点参数必须有限
//! - capture / sensor / display 按类型要求的字段齐全
//! - 传感器采样间隔 < filter.max_dt_s (否则所有样本都会被拒绝)

use contracts::{
    CaptureConfig, CaptureKind, ContractError, DisplayConfig, DisplayKind, RigConfig,
    SensorConfig, SensorKind,
};

/// 校验 RigConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RigConfig) -> Result<(), ContractError> {
    config.eye.check()?;
    config.filter.check()?;
    config.pipeline.check()?;
    validate_capture(&config.capture)?;
    validate_sensor(&config.sensor)?;
    validate_display(&config.display)?;
    validate_sample_interval(config)?;
    Ok(())
}

/// 校验屏幕捕获配置
fn validate_capture(capture: &CaptureConfig) -> Result<(), ContractError> {
    if capture.width == 0 || capture.height == 0 {
        return Err(ContractError::config_validation(
            "capture.width / capture.height",
            format!(
                "dimensions must be > 0, got {}x{}",
                capture.width, capture.height
            ),
        ));
    }
    if !capture.fps.is_finite() || capture.fps <= 0.0 {
        return Err(ContractError::config_validation(
            "capture.fps",
            format!("fps must be > 0, got {}", capture.fps),
        ));
    }
    if capture.kind == CaptureKind::Image && capture.image_path.is_none() {
        return Err(ContractError::config_validation(
            "capture.image_path",
            "image capture requires image_path",
        ));
    }
    Ok(())
}

/// 校验传感器配置
fn validate_sensor(sensor: &SensorConfig) -> Result<(), ContractError> {
    if sensor.source_id.is_empty() {
        return Err(ContractError::config_validation(
            "sensor.source_id",
            "source_id cannot be empty",
        ));
    }
    if !sensor.rate_hz.is_finite() || sensor.rate_hz <= 0.0 {
        return Err(ContractError::config_validation(
            "sensor.rate_hz",
            format!("rate_hz must be > 0, got {}", sensor.rate_hz),
        ));
    }
    if !sensor.yaw_sweep_deg_s.is_finite() {
        return Err(ContractError::config_validation(
            "sensor.yaw_sweep_deg_s",
            "must be finite",
        ));
    }
    if sensor.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "sensor.channel_capacity",
            "channel_capacity must be >= 1",
        ));
    }
    if sensor.kind == SensorKind::Replay && sensor.replay_path.is_none() {
        return Err(ContractError::config_validation(
            "sensor.replay_path",
            "replay transport requires replay_path",
        ));
    }
    Ok(())
}

/// 校验显示输出配置
fn validate_display(display: &DisplayConfig) -> Result<(), ContractError> {
    if display.every_nth == 0 {
        return Err(ContractError::config_validation(
            "display.every_nth",
            "every_nth must be >= 1",
        ));
    }
    if display.kind == DisplayKind::Png && display.output_dir.is_none() {
        return Err(ContractError::config_validation(
            "display.output_dir",
            "png display requires output_dir",
        ));
    }
    Ok(())
}

/// 校验采样间隔与滤波器最大 Δt 的关系
fn validate_sample_interval(config: &RigConfig) -> Result<(), ContractError> {
    let interval = 1.0 / config.sensor.rate_hz;
    if interval >= config.filter.max_dt_s {
        return Err(ContractError::config_validation(
            "sensor.rate_hz / filter.max_dt_s",
            format!(
                "sample interval {interval:.3}s must be < max_dt_s ({})",
                config.filter.max_dt_s
            ),
        ));
    }
    Ok(())
}
