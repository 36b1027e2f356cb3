//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ReencodeConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中性能档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `PerformanceProfile` 负责档位字符串解析与反向输出。
//! - `apply_performance_profile` 将档位转换为具体阈值。
//! - `infer_performance_profile` 用于从当前配置反推档位。
//!
//! 分类阈值与预算权重不在这里：它们是分类器 / 预算模块内的默认常量，
//! 调整时应保持 `tests/` 中的场景性质成立。

use image::imageops::FilterType;

use super::ReencodeError;
use super::codec::CodecKind;

/// 重编码配置。
///
/// 字段覆盖了读取、解码、特征采样、缩放、后处理与编码六个阶段。
#[derive(Debug, Clone)]
pub struct ReencodeConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 特征采样网格边长（N×N 个区域）。
    pub grid_size: u32,
    /// 每个区域采样方块的最大边长（像素）。
    pub max_sample_size: u32,
    /// 每个区域采样方块的最小边长（像素），仍受区域尺寸约束。
    pub min_sample_size: u32,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 是否级联缩放：大档位结果作为小档位的缩放源。
    pub cascade_resize: bool,
    /// 照片类缩小到原边长 70% 以下时是否锐化。
    pub sharpen_downscaled_photos: bool,
    /// 小档位是否按子类型做对比度/饱和度增强。
    pub tone_enhancement: bool,
    /// `max_dimension` 不超过该值的档位视为“小档位”。
    pub small_profile_max_dimension: u32,
    /// 输出编码器。
    pub codec: CodecKind,
    /// 档位并发上限，0 表示按 CPU 可用并行度。
    pub max_concurrency: usize,
}

impl Default for ReencodeConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            grid_size: 9,
            max_sample_size: 80,
            min_sample_size: 20,
            resize_filter: FilterType::CatmullRom,
            cascade_resize: true,
            sharpen_downscaled_photos: true,
            tone_enhancement: true,
            small_profile_max_dimension: 480,
            codec: CodecKind::Webp,
            max_concurrency: 0,
        }
    }
}

/// 性能档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真（Lanczos3、各档位独立缩放）
/// - `Balanced`：质量与性能平衡
/// - `Speed`：更小的采样网格与双线性缩放
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl PerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use adaptive_reencode::reencoder::PerformanceProfile;
    ///
    /// let p = PerformanceProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), adaptive_reencode::reencoder::ReencodeError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, ReencodeError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ReencodeError::Config(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ReencodeConfig {
    /// 基于当前参数反推性能档位。
    pub fn infer_performance_profile(&self) -> PerformanceProfile {
        if !self.cascade_resize && self.resize_filter == FilterType::Lanczos3 {
            return PerformanceProfile::Quality;
        }

        if self.grid_size < 9 || self.resize_filter == FilterType::Triangle {
            return PerformanceProfile::Speed;
        }

        PerformanceProfile::Balanced
    }

    /// 应用指定性能档位到实际参数。
    pub fn apply_performance_profile(&mut self, profile: PerformanceProfile) {
        match profile {
            PerformanceProfile::Quality => {
                self.grid_size = 9;
                self.max_sample_size = 80;
                self.resize_filter = FilterType::Lanczos3;
                self.cascade_resize = false;
            }
            PerformanceProfile::Balanced => {
                self.grid_size = 9;
                self.max_sample_size = 80;
                self.resize_filter = FilterType::CatmullRom;
                self.cascade_resize = true;
            }
            PerformanceProfile::Speed => {
                self.grid_size = 6;
                self.max_sample_size = 48;
                self.resize_filter = FilterType::Triangle;
                self.cascade_resize = true;
            }
        }
    }

    /// 校验配置自洽性。
    pub fn validate(&self) -> Result<(), ReencodeError> {
        if self.grid_size == 0 {
            return Err(ReencodeError::Config("grid_size 必须大于 0".to_string()));
        }
        if self.max_sample_size == 0 || self.min_sample_size > self.max_sample_size {
            return Err(ReencodeError::Config(format!(
                "采样尺寸范围无效：{}~{}",
                self.min_sample_size, self.max_sample_size
            )));
        }
        if self.max_file_size == 0 || self.max_decoded_pixels == 0 {
            return Err(ReencodeError::Config("输入限制不能为 0".to_string()));
        }
        Ok(())
    }

    /// 实际生效的档位并发数。
    pub(crate) fn effective_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            return self.max_concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
    }
}
