//! 重量波动模型
//!
//! 每次抽取一个 `[0, 1)` 均匀随机数 `r`，两个区间从 0 开始首尾相接：
//!
//! ```text
//! 0 ──── underweight.frequency ──── underweight.frequency + overweight.frequency ──── 1
//!   欠重                  超重                                         基准重量
//! ```

use domain::VariationConfig;
use rand::Rng;

/// 按配置计算最终重量。`config` 为空时直接返回基准重量。
pub fn vary<R: Rng + ?Sized>(base: u64, config: Option<&VariationConfig>, rng: &mut R) -> u64 {
    let draw: f64 = rng.gen_range(0.0..1.0);
    match config {
        Some(config) => vary_with_draw(base, config, draw),
        None => base,
    }
}

/// 给定抽样值的确定性版本。
pub fn vary_with_draw(base: u64, config: &VariationConfig, draw: f64) -> u64 {
    let base_f = base as f64;
    let under_frequency = config.underweight.map_or(0.0, |band| band.frequency);

    if let Some(band) = config.underweight
        && draw < band.frequency
    {
        return round_weight(base_f - base_f * band.amount);
    }
    if let Some(band) = config.overweight
        && draw < under_frequency + band.frequency
    {
        return round_weight(base_f + base_f * band.amount);
    }
    base
}

/// 四舍五入（非负值下 `f64::round` 即为 half-up）。
fn round_weight(value: f64) -> u64 {
    value.max(0.0).round() as u64
}
