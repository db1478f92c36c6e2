//! 应用运行配置加载。

use domain::{PresetScope, ProtocolPreset};
use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 控制面（HTTP/WebSocket）监听地址。
    pub control_addr: String,
    /// 数据面（原始 TCP）监听地址。
    pub data_addr: String,
    pub preset_scope: PresetScope,
    pub default_preset: ProtocolPreset,
    /// 每个数据面客户端最多排队的帧数。
    pub data_buffer: usize,
    /// 每个控制会话最多排队的通知数。
    pub notice_buffer: usize,
    /// 数据面写超时；`None` 表示不设超时。
    pub data_write_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            control_addr: "0.0.0.0:3000".to_string(),
            data_addr: "0.0.0.0:3001".to_string(),
            preset_scope: PresetScope::Session,
            default_preset: ProtocolPreset::crlf(),
            data_buffer: 64,
            notice_buffer: 32,
            data_write_timeout: None,
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let control_addr =
            env::var("CWSIM_CONTROL_ADDR").unwrap_or_else(|_| defaults.control_addr.clone());
        let data_addr = env::var("CWSIM_DATA_ADDR").unwrap_or_else(|_| defaults.data_addr.clone());
        let preset_scope = match read_optional("CWSIM_PRESET_SCOPE") {
            Some(value) => PresetScope::parse(&value)
                .ok_or_else(|| ConfigError::Invalid("CWSIM_PRESET_SCOPE".to_string(), value))?,
            None => defaults.preset_scope,
        };
        let default_preset = match read_optional("CWSIM_DEFAULT_PRESET") {
            Some(value) => ProtocolPreset::builtin(&value)
                .ok_or_else(|| ConfigError::Invalid("CWSIM_DEFAULT_PRESET".to_string(), value))?,
            None => defaults.default_preset,
        };
        let data_buffer = read_usize_with_default("CWSIM_DATA_BUFFER", defaults.data_buffer)?;
        let notice_buffer =
            read_usize_with_default("CWSIM_NOTICE_BUFFER", defaults.notice_buffer)?;
        let data_write_timeout = read_optional_u64("CWSIM_DATA_WRITE_TIMEOUT_MS")?
            .filter(|value| *value > 0)
            .map(Duration::from_millis);

        Ok(Self {
            control_addr,
            data_addr,
            preset_scope,
            default_preset,
            data_buffer,
            notice_buffer,
            data_write_timeout,
        })
    }
}

/// 读取正整数（通道容量不能为 0）。
fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}
