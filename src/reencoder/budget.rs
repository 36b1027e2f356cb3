//! # 体积预算规划
//!
//! ## 实现思路
//!
//! 目标 KB = 基数 + Σ(子类型权重 × 特征)，再按像素规模小幅放大，最后钳制到档位区间：
//!
//! - 基数：档位预算表中该类别的名义值；缺省为 `min_kb × 子类型倍率`
//! - 照片加重纹理/颜色数/自然度，线稿加重边缘与角点，界面加重边缘与颜色数
//! - 放大系数 `1 + min(MP, 5) / 10`，图标与纯色画布不放大
//! - 钳制到 `[min_kb, max_kb]`，返回字节数

use super::classifier::{Classification, Subtype};
use super::features::FeatureVector;
use super::profile::OutputProfile;

const MEGAPIXEL_SCALE_CAP: f64 = 5.0;
/// 未知 / 未评分子类型使用的保守倍率。
const FALLBACK_MULTIPLIER: f64 = 1.5;

/// 子类型的预算权重。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetWeights {
    pub multiplier: f64,
    pub texture: f64,
    /// 每千种颜色加多少 KB。
    pub colors_per_thousand: f64,
    pub naturalness: f64,
    pub micro_detail: f64,
    pub gradient_smoothness: f64,
    pub edge_density: f64,
    pub corner_density: f64,
    pub edge_sharpness: f64,
    pub scale_with_megapixels: bool,
}

const NONE: BudgetWeights = BudgetWeights {
    multiplier: FALLBACK_MULTIPLIER,
    texture: 0.0,
    colors_per_thousand: 0.0,
    naturalness: 0.0,
    micro_detail: 0.0,
    gradient_smoothness: 0.0,
    edge_density: 0.0,
    corner_density: 0.0,
    edge_sharpness: 0.0,
    scale_with_megapixels: true,
};

const UI_WEIGHTS: BudgetWeights = BudgetWeights {
    multiplier: 1.2,
    edge_density: 110.0,
    colors_per_thousand: 50.0,
    ..NONE
};

pub fn weights(subtype: Subtype) -> BudgetWeights {
    match subtype {
        Subtype::PhotoNatural => BudgetWeights {
            multiplier: 0.8,
            texture: 90.0,
            colors_per_thousand: 18.0,
            naturalness: 45.0,
            micro_detail: 50.0,
            ..NONE
        },
        Subtype::PhotoPortrait => BudgetWeights {
            multiplier: 0.8,
            texture: 80.0,
            colors_per_thousand: 20.0,
            gradient_smoothness: 60.0,
            ..NONE
        },
        Subtype::PhotoLowcolor => BudgetWeights {
            multiplier: 0.8,
            texture: 60.0,
            colors_per_thousand: 12.0,
            naturalness: 40.0,
            ..NONE
        },
        Subtype::PhotoGeneral => BudgetWeights {
            multiplier: 0.8,
            texture: 75.0,
            colors_per_thousand: 15.0,
            naturalness: 40.0,
            ..NONE
        },
        Subtype::LineArtPure => BudgetWeights {
            multiplier: 0.7,
            edge_density: 120.0,
            corner_density: 1.5,
            ..NONE
        },
        Subtype::LogoSimple => BudgetWeights {
            multiplier: 0.6,
            edge_sharpness: 15.0,
            colors_per_thousand: 500.0,
            ..NONE
        },
        Subtype::LogoComplex => BudgetWeights {
            multiplier: 0.8,
            edge_sharpness: 30.0,
            colors_per_thousand: 100.0,
            ..NONE
        },
        Subtype::UiBlocks => BudgetWeights {
            multiplier: 1.035,
            edge_density: 100.0,
            ..NONE
        },
        Subtype::UiGrid | Subtype::UiGeneral | Subtype::UiStructured | Subtype::Screenshot => {
            UI_WEIGHTS
        }
        Subtype::Graphic => BudgetWeights {
            multiplier: 1.0,
            colors_per_thousand: 1000.0 / 150.0 * 8.0,
            texture: 40.0,
            ..NONE
        },
        Subtype::IconSmall | Subtype::IconFlat | Subtype::GraphicFlat => BudgetWeights {
            multiplier: 0.7,
            scale_with_megapixels: false,
            ..NONE
        },
        Subtype::Vector => NONE,
    }
}

/// 名义预算（KB，钳制前）。
pub fn nominal_kb(
    profile: &OutputProfile,
    classification: &Classification,
    features: &FeatureVector,
) -> f64 {
    let w = weights(classification.subtype);

    let base = profile
        .budgets
        .get(&classification.category)
        .copied()
        .unwrap_or(profile.min_kb as f64 * w.multiplier);

    let contributions = w.texture * features.texture_score
        + w.colors_per_thousand * features.unique_color_count as f64 / 1000.0
        + w.naturalness * features.naturalness
        + w.micro_detail * features.micro_detail_density
        + w.gradient_smoothness * features.gradient_smoothness
        + w.edge_density * features.edge_density
        + w.corner_density * features.corner_density
        + w.edge_sharpness * features.edge_sharpness;

    let scale = if w.scale_with_megapixels {
        1.0 + features.megapixels.clamp(0.0, MEGAPIXEL_SCALE_CAP) / 10.0
    } else {
        1.0
    };

    (base + contributions) * scale
}

/// 规划目标字节数，保证落在 `[min_kb × 1024, max_kb × 1024]`。
pub fn plan(profile: &OutputProfile, classification: &Classification, features: &FeatureVector) -> u64 {
    let nominal = nominal_kb(profile, classification, features);
    let min_kb = profile.min_kb as f64;
    let max_kb = (profile.max_kb as f64).max(min_kb);

    let clamped_kb = if nominal.is_finite() {
        nominal.clamp(min_kb, max_kb)
    } else {
        min_kb
    };

    let target = (clamped_kb * 1024.0).round() as u64;
    let target = target.clamp(profile.min_bytes(), profile.max_bytes().max(profile.min_bytes()));

    log::debug!(
        "📐 [{}] {} → 名义 {:.1}KB，目标 {:.1}KB（区间 {}~{}KB）",
        profile.name,
        classification.subtype.as_str(),
        nominal,
        target as f64 / 1024.0,
        profile.min_kb,
        profile.max_kb
    );

    target
}
