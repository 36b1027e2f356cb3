//! # 自适应编码（质量二分）
//!
//! ## 实现思路
//!
//! 在 q ∈ [0, 1] 上做固定次数的二分：
//! - 体积 > 目标：`high = q`
//! - 否则记为当前最优并 `low = q`；若与目标差距小于容差则提前结束
//!
//! 标志 / 线稿对质量更敏感，使用 15 次迭代 + 3% 容差；其它 12 次 + 5%。
//! 试编码质量不低于 `MIN_QUALITY`；没有任何候选满足预算时，返回 `MIN_QUALITY`
//! 的编码并标记 `budget_met = false`。
//! 搜索过程中不产生任何中间结果。

use image::RgbaImage;

use super::ReencodeError;
use super::classifier::Subtype;
use super::codec::Codec;

/// 兜底质量。
pub const MIN_QUALITY: f64 = 0.05;

/// 二分参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub iterations: u32,
    pub tolerance: f64,
}

impl SearchParams {
    pub fn for_subtype(subtype: Subtype) -> Self {
        if subtype.is_precision_sensitive() {
            Self {
                iterations: 15,
                tolerance: 0.03,
            }
        } else {
            Self {
                iterations: 12,
                tolerance: 0.05,
            }
        }
    }
}

/// 编码结果。
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    pub bytes: Vec<u8>,
    pub quality: f64,
    pub budget_met: bool,
    /// 实际执行的编码次数（含兜底）。
    pub trials: u32,
}

/// 在预算内寻找最高质量的编码。
pub fn encode<C>(
    codec: &dyn Codec,
    image: &RgbaImage,
    target_bytes: u64,
    subtype: Subtype,
    is_cancelled: C,
) -> Result<EncodeOutcome, ReencodeError>
where
    C: Fn() -> bool,
{
    let params = SearchParams::for_subtype(subtype);
    let mut low = 0.0_f64;
    let mut high = 1.0_f64;
    let mut best: Option<(Vec<u8>, f64)> = None;
    let mut floor_attempt: Option<Vec<u8>> = None;
    let mut trials = 0u32;

    for _ in 0..params.iterations {
        if is_cancelled() {
            return Err(ReencodeError::Cancelled("编码已取消".to_string()));
        }

        let quality = ((low + high) / 2.0).max(MIN_QUALITY);
        let bytes = codec.encode(image, quality)?;
        trials += 1;
        let size = bytes.len() as u64;

        log::debug!(
            "🔁 试编码 #{} q={:.4} size={} target={}",
            trials,
            quality,
            size,
            target_bytes
        );

        if size > target_bytes {
            if quality <= MIN_QUALITY {
                floor_attempt = Some(bytes);
                break;
            }
            high = quality;
            continue;
        }

        best = Some((bytes, quality));
        low = quality;

        if ((target_bytes - size) as f64) < target_bytes as f64 * params.tolerance {
            break;
        }
    }

    if let Some((bytes, quality)) = best {
        return Ok(EncodeOutcome {
            bytes,
            quality,
            budget_met: true,
            trials,
        });
    }

    let bytes = match floor_attempt {
        Some(bytes) => bytes,
        None => {
            if is_cancelled() {
                return Err(ReencodeError::Cancelled("编码已取消".to_string()));
            }
            trials += 1;
            codec.encode(image, MIN_QUALITY)?
        }
    };

    let budget_met = bytes.len() as u64 <= target_bytes;
    if !budget_met {
        log::warn!(
            "⚠️ 预算不可达：最低质量 {} 仍为 {} 字节（目标 {} 字节）",
            MIN_QUALITY,
            bytes.len(),
            target_bytes
        );
    }

    Ok(EncodeOutcome {
        bytes,
        quality: MIN_QUALITY,
        budget_met,
        trials,
    })
}
