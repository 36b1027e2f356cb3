//! # 缩放后视觉增强
//!
//! ## 设计思路
//!
//! 增强是可组合、可单独开关的后处理步骤，与预算/编码逻辑完全解耦：
//! - `Sharpen`：照片缩到原边长 70% 以下时做 4 邻域反锐化，补偿缩放带来的软化
//! - `Tone`：对比度 / 饱和度 / 亮度调整（按 CSS filter 语义依次应用）
//!
//! `enhancement_plan` 只根据子类型、缩放比例与档位大小决定要做哪些步骤。

use image::RgbaImage;
use serde::Serialize;

use super::ReencodeConfig;
use super::classifier::{Category, Subtype};
use super::features::FeatureVector;

const SHARPEN_SCALE_THRESHOLD: f64 = 0.7;
const SHARPEN_STRENGTH: f32 = 0.3;
const SHARP_EDGE_THRESHOLD: f64 = 0.5;

/// 单个后处理步骤。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    Sharpen {
        strength: f32,
    },
    Tone {
        contrast: f32,
        saturation: f32,
        brightness: f32,
    },
}

impl Transform {
    fn tone(contrast: f32, saturation: f32, brightness: f32) -> Self {
        Self::Tone {
            contrast,
            saturation,
            brightness,
        }
    }

    /// 日志与报告用的简短描述。
    pub fn label(&self) -> String {
        match self {
            Self::Sharpen { strength } => format!("sharpen({:.2})", strength),
            Self::Tone {
                contrast,
                saturation,
                brightness,
            } => format!(
                "tone(contrast={:.2}, saturate={:.2}, brightness={:.2})",
                contrast, saturation, brightness
            ),
        }
    }

    pub fn apply(&self, image: &mut RgbaImage) {
        match *self {
            Self::Sharpen { strength } => sharpen(image, strength),
            Self::Tone {
                contrast,
                saturation,
                brightness,
            } => tone(image, contrast, saturation, brightness),
        }
    }
}

/// 依次应用全部步骤。
pub fn apply_all(image: &mut RgbaImage, transforms: &[Transform]) {
    for transform in transforms {
        transform.apply(image);
    }
}

/// 决定某个档位的增强步骤。
///
/// `scale` 为输出最长边 / 原图最长边。
pub fn enhancement_plan(
    subtype: Subtype,
    features: &FeatureVector,
    scale: f64,
    profile_max_dimension: u32,
    config: &ReencodeConfig,
) -> Vec<Transform> {
    let mut plan = Vec::new();

    if config.sharpen_downscaled_photos
        && subtype.category() == Category::Photo
        && scale < SHARPEN_SCALE_THRESHOLD
    {
        plan.push(Transform::Sharpen {
            strength: SHARPEN_STRENGTH,
        });
    }

    if !config.tone_enhancement {
        return plan;
    }

    let small = profile_max_dimension <= config.small_profile_max_dimension;
    let tone = match subtype {
        Subtype::PhotoNatural | Subtype::PhotoPortrait if small => {
            Some(Transform::tone(1.05, 1.04, 1.01))
        }
        Subtype::UiBlocks
        | Subtype::UiGrid
        | Subtype::UiGeneral
        | Subtype::UiStructured
        | Subtype::Screenshot
        | Subtype::LogoSimple
        | Subtype::LogoComplex
            if small && features.edge_sharpness > SHARP_EDGE_THRESHOLD =>
        {
            Some(Transform::tone(1.08, 1.0, 1.0))
        }
        Subtype::LineArtPure => Some(Transform::tone(1.12, 1.0, 1.02)),
        Subtype::Graphic if small => Some(Transform::tone(1.04, 1.03, 1.0)),
        _ => None,
    };
    plan.extend(tone);
    plan
}

/// 4 邻域反锐化：`v + (v - 邻域均值) × strength`，只处理内部像素的 RGB。
fn sharpen(image: &mut RgbaImage, strength: f32) {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 || strength == 0.0 {
        return;
    }

    let source = image.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let current = source.get_pixel(x, y).0;
            let left = source.get_pixel(x - 1, y).0;
            let right = source.get_pixel(x + 1, y).0;
            let up = source.get_pixel(x, y - 1).0;
            let down = source.get_pixel(x, y + 1).0;

            let pixel = image.get_pixel_mut(x, y);
            for c in 0..3 {
                let value = current[c] as f32;
                let neighbor =
                    (left[c] as f32 + right[c] as f32 + up[c] as f32 + down[c] as f32) / 4.0;
                pixel.0[c] = (value + (value - neighbor) * strength).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// 对比度 → 饱和度 → 亮度。
fn tone(image: &mut RgbaImage, contrast: f32, saturation: f32, brightness: f32) {
    let s = saturation;
    let matrix = [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ];

    for pixel in image.pixels_mut() {
        let contrasted = [0, 1, 2].map(|c| {
            ((pixel.0[c] as f32 / 255.0 - 0.5) * contrast + 0.5).clamp(0.0, 1.0)
        });
        for (c, row) in matrix.iter().enumerate() {
            let saturated = row[0] * contrasted[0] + row[1] * contrasted[1] + row[2] * contrasted[2];
            let value = (saturated.clamp(0.0, 1.0) * brightness).clamp(0.0, 1.0);
            pixel.0[c] = (value * 255.0).round() as u8;
        }
    }
}
