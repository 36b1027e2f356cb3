//! # 内容分类模块
//!
//! ## 设计思路
//!
//! 四层判定，命中即短路：
//! 1. 即时规则：MIME / 文件名 / 尺寸，不依赖像素统计
//! 2. 绝对排除：高置信（96~99）的硬性合取条件
//! 3. 交叉验证：结合自然度、有机度、方向性与颜色数区分照片与界面/标志（94~96）
//! 4. 加权评分：逐类别累加奖惩项，最高分胜出
//!
//! ## 实现思路
//!
//! - 前三层是 `rules` 中的有序静态规则表，第四层是 `scoring` 中的评分表。
//! - 每一层都可以单独测试；`classify` 只负责按顺序串联。
//! - 纯函数、无隐藏状态：相同输入必得相同结果。

mod rules;
mod scoring;

pub use rules::{ABSOLUTE_RULES, CROSS_VALIDATION_RULES, EliminationRule, INSTANT_RULES};
pub use scoring::{SCORERS, ScoreCard, score_all};

use serde::{Deserialize, Serialize};

use super::ReencodeError;
use super::features::FeatureVector;
use super::source::FileMeta;

/// 内容大类（闭集）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Icon,
    LineArt,
    Logo,
    Ui,
    Screenshot,
    Graphic,
    Photo,
    Vector,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Icon,
        Self::LineArt,
        Self::Logo,
        Self::Ui,
        Self::Screenshot,
        Self::Graphic,
        Self::Photo,
        Self::Vector,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Icon => "ICON",
            Self::LineArt => "LINE_ART",
            Self::Logo => "LOGO",
            Self::Ui => "UI",
            Self::Screenshot => "SCREENSHOT",
            Self::Graphic => "GRAPHIC",
            Self::Photo => "PHOTO",
            Self::Vector => "VECTOR",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Result<Self, ReencodeError> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ReencodeError::Config(format!("未知内容类别：{}", name)))
    }
}

/// 内容子类型，每个子类型唯一归属一个大类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subtype {
    IconSmall,
    IconFlat,
    LineArtPure,
    LogoSimple,
    LogoComplex,
    UiBlocks,
    UiGrid,
    UiStructured,
    UiGeneral,
    Screenshot,
    Graphic,
    GraphicFlat,
    PhotoNatural,
    PhotoPortrait,
    PhotoLowcolor,
    PhotoGeneral,
    Vector,
}

impl Subtype {
    pub fn category(self) -> Category {
        match self {
            Self::IconSmall | Self::IconFlat => Category::Icon,
            Self::LineArtPure => Category::LineArt,
            Self::LogoSimple | Self::LogoComplex => Category::Logo,
            Self::UiBlocks | Self::UiGrid | Self::UiStructured | Self::UiGeneral => Category::Ui,
            Self::Screenshot => Category::Screenshot,
            Self::Graphic | Self::GraphicFlat => Category::Graphic,
            Self::PhotoNatural | Self::PhotoPortrait | Self::PhotoLowcolor | Self::PhotoGeneral => {
                Category::Photo
            }
            Self::Vector => Category::Vector,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IconSmall => "ICON_SMALL",
            Self::IconFlat => "ICON_FLAT",
            Self::LineArtPure => "LINE_ART_PURE",
            Self::LogoSimple => "LOGO_SIMPLE",
            Self::LogoComplex => "LOGO_COMPLEX",
            Self::UiBlocks => "UI_BLOCKS",
            Self::UiGrid => "UI_GRID",
            Self::UiStructured => "UI_STRUCTURED",
            Self::UiGeneral => "UI_GENERAL",
            Self::Screenshot => "SCREENSHOT",
            Self::Graphic => "GRAPHIC",
            Self::GraphicFlat => "GRAPHIC_FLAT",
            Self::PhotoNatural => "PHOTO_NATURAL",
            Self::PhotoPortrait => "PHOTO_PORTRAIT",
            Self::PhotoLowcolor => "PHOTO_LOWCOLOR",
            Self::PhotoGeneral => "PHOTO_GENERAL",
            Self::Vector => "VECTOR",
        }
    }

    /// 对质量更敏感的子类型（细线、标志），编码器会用更多迭代与更紧容差。
    pub fn is_precision_sensitive(self) -> bool {
        matches!(
            self.category(),
            Category::Logo | Category::LineArt
        )
    }
}

/// 产出分类结果的判定层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Instant,
    Absolute,
    CrossValidation,
    Scoring,
}

/// 一次任务唯一的分类结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub subtype: Subtype,
    /// 置信度（0~100）。
    pub confidence: f64,
    /// 命中规则或评分项轨迹。
    pub reason: String,
    pub tier: Tier,
}

impl Classification {
    fn from_rule(rule: &EliminationRule) -> Self {
        Self {
            category: rule.subtype.category(),
            subtype: rule.subtype,
            confidence: rule.confidence,
            reason: format!("{}：{}", rule.name, rule.reason),
            tier: rule.tier,
        }
    }
}

/// 对特征向量做四层分类。
pub fn classify(features: &FeatureVector, meta: &FileMeta) -> Classification {
    let matched = [INSTANT_RULES, ABSOLUTE_RULES, CROSS_VALIDATION_RULES]
        .into_iter()
        .flatten()
        .find(|rule| (rule.predicate)(features, meta));

    let classification = match matched {
        Some(rule) => Classification::from_rule(rule),
        None => score_decision(features),
    };

    log::debug!(
        "🏷️ 分类结果 - {} ({:.0}%) tier={:?} reason={}",
        classification.subtype.as_str(),
        classification.confidence,
        classification.tier,
        classification.reason
    );

    classification
}

/// 第四层：评分表取最高分，并按辅助阈值推导子类型。
fn score_decision(features: &FeatureVector) -> Classification {
    let cards = score_all(features);
    let winner = cards
        .iter()
        .fold(None::<&ScoreCard>, |best, card| match best {
            Some(current) if current.total >= card.total => Some(current),
            _ => Some(card),
        });

    let Some(winner) = winner else {
        return Classification {
            category: Category::Graphic,
            subtype: Subtype::Graphic,
            confidence: 40.0,
            reason: "评分表为空".to_string(),
            tier: Tier::Scoring,
        };
    };

    let subtype = scoring::derive_subtype(winner.category, features);
    Classification {
        category: winner.category,
        subtype,
        confidence: (winner.total / 2.0).clamp(40.0, 93.0),
        reason: winner.trace(),
        tier: Tier::Scoring,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FeatureVector;

    /// 中性特征：不会命中任何排除规则，便于单独调某几个字段。
    pub(crate) fn neutral_features() -> FeatureVector {
        FeatureVector {
            width: 1600,
            height: 1200,
            aspect_ratio: 1600.0 / 1200.0,
            megapixels: 1.92,
            region_count: 81,
            sampled_pixels: 81 * 6400,
            unique_color_count: 600,
            dominant_color_ratio: 0.1,
            histogram_peakiness: 0.2,
            color_entropy: 4.0,
            saturation_mean: 15.0,
            saturation_std_dev: 10.0,
            brightness_range: 180.0,
            hue_diversity: 0.3,
            texture_score: 0.15,
            texture_coherence: 2.0,
            noise_level: 0.1,
            local_variation: 0.1,
            micro_detail_density: 0.2,
            edge_density: 0.05,
            edge_sharpness: 0.3,
            edge_uniformity: 0.8,
            edge_directionality: 0.5,
            corner_density: 2.0,
            pattern_repetition: 0.6,
            geometric_regularity: 0.02,
            blockiness: 0.1,
            grid_score: 0.05,
            symmetry_score: 0.3,
            naturalness: 0.3,
            organic_score: 0.5,
            artificial_edge_ratio: 0.15,
            flatness_ratio: 0.2,
            region_consistency: 0.7,
            center_weight_score: 1.0,
            color_block_ratio: 0.1,
            gradient_smoothness: 0.4,
            has_transparency: false,
            transparency_ratio: 0.0,
        }
    }
}
