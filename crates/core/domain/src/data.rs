/// STX（Start of Text）。
pub const STX: u8 = 0x02;
/// ETX（End of Text）。
pub const ETX: u8 = 0x03;

/// 帧格式预设：`prefix ∥ 重量数字 ∥ suffix`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolPreset {
    pub name: String,
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
}

impl ProtocolPreset {
    pub const STXETX: &'static str = "STXETX";
    pub const CRLF: &'static str = "CRLF";
    pub const CUSTOM: &'static str = "CUSTOM";

    /// `0x02 ∥ weight ∥ 0x03`
    pub fn stx_etx() -> Self {
        Self {
            name: Self::STXETX.to_string(),
            prefix: vec![STX],
            suffix: vec![ETX],
        }
    }

    /// `weight ∥ \r\n`
    pub fn crlf() -> Self {
        Self {
            name: Self::CRLF.to_string(),
            prefix: Vec::new(),
            suffix: b"\r\n".to_vec(),
        }
    }

    /// 自定义前后缀（已解码为原始字节）。
    pub fn custom(prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        Self {
            name: Self::CUSTOM.to_string(),
            prefix,
            suffix,
        }
    }

    /// 按名称查找内置预设（区分大小写）。
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            Self::STXETX => Some(Self::stx_etx()),
            Self::CRLF => Some(Self::crlf()),
            _ => None,
        }
    }
}

impl Default for ProtocolPreset {
    fn default() -> Self {
        Self::crlf()
    }
}

/// `settings` 消息的作用范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresetScope {
    /// 每个控制会话独立保存预设。
    #[default]
    Session,
    /// 全进程共享一个预设，任意会话修改后对所有广播生效。
    Global,
}

impl PresetScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "session" | "per_session" | "per-session" => Some(Self::Session),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// 单个波动方向：`frequency` 为命中概率，`amount` 为相对基准重量的比例。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationBand {
    pub frequency: f64,
    pub amount: f64,
}

/// 欠重/超重波动配置。两者的 frequency 之和不超过 1。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VariationConfig {
    pub underweight: Option<VariationBand>,
    pub overweight: Option<VariationBand>,
}

/// 单次发送使用的帧格式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// 使用当前生效的预设（会话级或全局）。
    Active,
    /// 消息自带的前后缀文本，`\xHH` 尚未解码。
    Custom { prefix: String, suffix: String },
}

/// 连续发送参数（已校验）。
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSpec {
    pub base_weight: u64,
    pub weights_per_minute: u32,
    pub variation: Option<VariationConfig>,
}

/// 校验后的控制指令。
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// 单次广播；`weight` 为原样保留的数字串。
    SendWeight { weight: String, framing: Framing },
    SelectPreset(ProtocolPreset),
    StartContinuous(ContinuousSpec),
    StopContinuous,
}
