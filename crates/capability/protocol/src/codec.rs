//! 重量读数成帧
//!
//! 数据面输出为原始字节：`prefix ∥ utf8(weight) ∥ suffix`。
//!
//! ```rust,ignore
//! let bytes = frame("1234", &ProtocolPreset::stx_etx());
//! assert_eq!(&bytes[..], b"\x021234\x03");
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use domain::ProtocolPreset;

/// 按预设拼接帧。不校验 `weight`，空串只输出前后缀。
pub fn frame(weight: &str, preset: &ProtocolPreset) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(preset.prefix.len() + weight.len() + preset.suffix.len());
    buf.put_slice(&preset.prefix);
    buf.put_slice(weight.as_bytes());
    buf.put_slice(&preset.suffix);
    buf.freeze()
}

/// 解码 `\xHH` 转义为单个原始字节，其他字符按 UTF-8 原样输出。
///
/// 不完整或非法的转义（如 `\x4` 或 `\xZZ`）不报错，按字面字节输出。
pub fn decode_escapes(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 2).and_then(|b| hex_value(*b)),
                bytes.get(i + 3).and_then(|b| hex_value(*b)),
            ) {
                out.push(hi << 4 | lo);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// 由消息自带的前后缀文本构造自定义预设。
pub fn custom_preset(prefix: &str, suffix: &str) -> ProtocolPreset {
    ProtocolPreset::custom(decode_escapes(prefix), decode_escapes(suffix))
}

/// 日志展示：控制字符渲染为 `<STX>`、`<ETX>`、`<CR>`、`<LF>` 或 `<hh>`。
pub fn render_frame(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\x02' => out.push_str("<STX>"),
            '\x03' => out.push_str("<ETX>"),
            '\r' => out.push_str("<CR>"),
            '\n' => out.push_str("<LF>"),
            c if (c as u32) < 0x20 => out.push_str(&format!("<{:02x}>", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|v| v as u8)
}
