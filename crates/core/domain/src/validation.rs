//! 控制面输入校验。
//!
//! 校验只在传输边界执行一次；通过校验的值才会进入 `ControlCommand`。

use crate::data::{ProtocolPreset, VariationBand, VariationConfig};

pub const MIN_WEIGHTS_PER_MINUTE: u32 = 1;
pub const MAX_WEIGHTS_PER_MINUTE: u32 = 600;

/// 浮点求和误差容忍度（0.7 + 0.3 之类的组合）。
const FREQUENCY_SUM_EPSILON: f64 = 1e-9;

/// 输入校验错误，仅回送给发起请求的控制会话。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("weight must be a non-negative integer, got {0:?}")]
    InvalidWeight(String),
    #[error("weight {0} is out of range")]
    WeightOutOfRange(String),
    #[error("weightsPerMinute must be an integer between 1 and 600, got {0}")]
    InvalidRate(String),
    #[error("{band} frequency must be between 0 and 1, got {value}")]
    InvalidFrequency { band: &'static str, value: f64 },
    #[error("{band} amount must be between 0 and 1, got {value}")]
    InvalidAmount { band: &'static str, value: f64 },
    #[error("underweight and overweight frequencies sum to {0}, which exceeds 1")]
    FrequencySumExceeded(f64),
    #[error("variations must define underweight or overweight")]
    EmptyVariation,
    #[error("unknown control characters {0:?}")]
    UnknownPreset(String),
}

/// 校验重量文本（`^[0-9]+$`）并解析为整数。
pub fn validate_weight(text: &str) -> Result<u64, ValidationError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidWeight(text.to_string()));
    }
    text.parse::<u64>()
        .map_err(|_| ValidationError::WeightOutOfRange(text.to_string()))
}

/// 校验每分钟发送次数：必须是 [1, 600] 内的整数。
pub fn validate_rate(value: f64) -> Result<u32, ValidationError> {
    let integral = value.is_finite() && value.fract() == 0.0;
    if !integral
        || value < f64::from(MIN_WEIGHTS_PER_MINUTE)
        || value > f64::from(MAX_WEIGHTS_PER_MINUTE)
    {
        return Err(ValidationError::InvalidRate(value.to_string()));
    }
    Ok(value as u32)
}

/// 校验波动配置：每个 frequency/amount 在 [0, 1] 内，且 frequency 之和不超过 1。
pub fn validate_variation(config: &VariationConfig) -> Result<(), ValidationError> {
    if config.underweight.is_none() && config.overweight.is_none() {
        return Err(ValidationError::EmptyVariation);
    }
    let mut total = 0.0;
    if let Some(band) = &config.underweight {
        validate_band("underweight", band)?;
        total += band.frequency;
    }
    if let Some(band) = &config.overweight {
        validate_band("overweight", band)?;
        total += band.frequency;
    }
    if total > 1.0 + FREQUENCY_SUM_EPSILON {
        return Err(ValidationError::FrequencySumExceeded(total));
    }
    Ok(())
}

/// 按名称解析内置预设。
pub fn resolve_preset(name: &str) -> Result<ProtocolPreset, ValidationError> {
    ProtocolPreset::builtin(name).ok_or_else(|| ValidationError::UnknownPreset(name.to_string()))
}

fn validate_band(band: &'static str, value: &VariationBand) -> Result<(), ValidationError> {
    if !is_probability(value.frequency) {
        return Err(ValidationError::InvalidFrequency {
            band,
            value: value.frequency,
        });
    }
    if !is_probability(value.amount) {
        return Err(ValidationError::InvalidAmount {
            band,
            value: value.amount,
        });
    }
    Ok(())
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
