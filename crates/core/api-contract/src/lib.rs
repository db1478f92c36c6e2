//! 控制面线协议契约：入站控制消息、出站通知与指标 DTO。
//!
//! 控制消息在传输边界只反序列化并校验一次，之后以 `domain::ControlCommand`
//! 的形式流转。

use domain::validation::{resolve_preset, validate_rate, validate_variation, validate_weight};
use domain::{
    ContinuousSpec, ControlCommand, Framing, ValidationError, VariationBand, VariationConfig,
};
use serde::{Deserialize, Serialize};

/// 控制消息解析错误（JSON 非法、未知 `type`、缺字段等）。
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("control messages must be text frames")]
    NotText,
}

/// 入站控制消息（按 `type` 字段区分）。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// 单次发送。
    Weight {
        weight: WeightValue,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
    },
    /// 切换帧格式预设。
    Settings {
        #[serde(rename = "controlChars")]
        control_chars: String,
    },
    /// 启动（或替换）连续发送。
    StartContinuous {
        weight: WeightValue,
        #[serde(rename = "weightsPerMinute")]
        weights_per_minute: f64,
        #[serde(default)]
        variations: Option<VariationsDto>,
    },
    StopContinuous,
}

/// 前端按字符串发送重量，也兼容直接发送 JSON 数字。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Text(String),
    Number(serde_json::Number),
}

impl WeightValue {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }
}

/// 波动配置 DTO。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VariationsDto {
    #[serde(default)]
    pub underweight: Option<VariationBandDto>,
    #[serde(default)]
    pub overweight: Option<VariationBandDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VariationBandDto {
    pub frequency: f64,
    pub amount: f64,
}

impl From<VariationBandDto> for VariationBand {
    fn from(dto: VariationBandDto) -> Self {
        Self {
            frequency: dto.frequency,
            amount: dto.amount,
        }
    }
}

impl From<VariationsDto> for VariationConfig {
    fn from(dto: VariationsDto) -> Self {
        Self {
            underweight: dto.underweight.map(Into::into),
            overweight: dto.overweight.map(Into::into),
        }
    }
}

impl ControlMessage {
    /// 从 WebSocket 文本帧解析。
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// 校验并转换为领域指令。
    pub fn into_command(self) -> Result<ControlCommand, ValidationError> {
        match self {
            Self::Weight {
                weight,
                prefix,
                suffix,
            } => {
                let weight = weight.as_text();
                validate_weight(&weight)?;
                let framing = if prefix.is_none() && suffix.is_none() {
                    Framing::Active
                } else {
                    Framing::Custom {
                        prefix: prefix.unwrap_or_default(),
                        suffix: suffix.unwrap_or_default(),
                    }
                };
                Ok(ControlCommand::SendWeight { weight, framing })
            }
            Self::Settings { control_chars } => {
                Ok(ControlCommand::SelectPreset(resolve_preset(&control_chars)?))
            }
            Self::StartContinuous {
                weight,
                weights_per_minute,
                variations,
            } => {
                let base_weight = validate_weight(&weight.as_text())?;
                let weights_per_minute = validate_rate(weights_per_minute)?;
                let variation = variations.map(VariationConfig::from);
                if let Some(config) = &variation {
                    validate_variation(config)?;
                }
                Ok(ControlCommand::StartContinuous(ContinuousSpec {
                    base_weight,
                    weights_per_minute,
                    variation,
                }))
            }
            Self::StopContinuous => Ok(ControlCommand::StopContinuous),
        }
    }
}

/// 出站控制面通知。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlNotice {
    /// 当前在线的数据面客户端数量。
    ClientCount { count: usize },
    /// 控制消息被拒绝的原因。
    Error { message: String },
}

impl ControlNotice {
    pub fn rejected(err: &ValidationError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// 发送计数快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub ticks_fired: u64,
    pub frames_broadcast: u64,
    pub frames_delivered: u64,
    pub frames_dropped_backpressure: u64,
    pub delivery_failures: u64,
    pub validation_rejected: u64,
    pub protocol_errors: u64,
    pub control_sessions_opened: u64,
    pub data_clients_opened: u64,
}
