//! # 帧编解码能力模块
//!
//! 把重量数字串按协议预设拼接成数据面字节流：
//! - **STXETX**：`0x02 ∥ weight ∥ 0x03`
//! - **CRLF**：`weight ∥ 0x0D 0x0A`
//! - **自定义**：消息自带前后缀文本，`\xHH` 解码为原始字节
//!
//! 编码是纯函数，重量文本的校验在传输边界完成。

mod codec;

pub use codec::{custom_preset, decode_escapes, frame, render_frame};
