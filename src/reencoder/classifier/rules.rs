//! 有序排除规则表（即时 / 绝对排除 / 交叉验证）。
//!
//! 表内顺序即优先级；阈值是经验默认值，可整体调优。

use once_cell::sync::Lazy;
use regex::RegexSet;

use super::{Subtype, Tier};
use crate::reencoder::features::FeatureVector;
use crate::reencoder::loader::SVG_MIME_TYPE;
use crate::reencoder::source::FileMeta;

/// 一条合取式排除规则。
#[derive(Debug, Clone, Copy)]
pub struct EliminationRule {
    pub name: &'static str,
    pub tier: Tier,
    pub subtype: Subtype,
    pub confidence: f64,
    pub reason: &'static str,
    pub predicate: fn(&FeatureVector, &FileMeta) -> bool,
}

/// 截图类文件名提示。
static SCREENSHOT_NAME_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)screen[\s_-]?shot",
        r"(?i)screen",
        r"(?i)snip",
        r"截图",
        r"屏幕截图",
    ])
    .expect("截图文件名正则应能编译")
});

const ICON_MAX_EDGE: u32 = 128;
const ICON_MAX_FILE_SIZE: u64 = 50_000;

pub static INSTANT_RULES: &[EliminationRule] = &[
    EliminationRule {
        name: "VECTOR",
        tier: Tier::Instant,
        subtype: Subtype::Vector,
        confidence: 100.0,
        reason: "SVG 矢量图",
        predicate: is_svg,
    },
    EliminationRule {
        name: "SCREENSHOT",
        tier: Tier::Instant,
        subtype: Subtype::Screenshot,
        confidence: 95.0,
        reason: "文件名提示为截图",
        predicate: has_screenshot_name,
    },
    EliminationRule {
        name: "ICON_SMALL",
        tier: Tier::Instant,
        subtype: Subtype::IconSmall,
        confidence: 95.0,
        reason: "尺寸与体积都很小",
        predicate: is_tiny_file,
    },
];

pub static ABSOLUTE_RULES: &[EliminationRule] = &[
    EliminationRule {
        name: "ICON_FLAT",
        tier: Tier::Absolute,
        subtype: Subtype::IconFlat,
        confidence: 99.0,
        reason: "极少颜色 + 平坦 + 低像素",
        predicate: is_flat_icon,
    },
    EliminationRule {
        name: "GRAPHIC_FLAT",
        tier: Tier::Absolute,
        subtype: Subtype::GraphicFlat,
        confidence: 97.0,
        reason: "纯色或近纯色画布",
        predicate: is_flat_canvas,
    },
    EliminationRule {
        name: "LINE_ART_PURE",
        tier: Tier::Absolute,
        subtype: Subtype::LineArtPure,
        confidence: 98.0,
        reason: "低饱和 + 锐利稀疏边缘 + 无纹理",
        predicate: is_pure_line_art,
    },
    EliminationRule {
        name: "UI_BLOCKS",
        tier: Tier::Absolute,
        subtype: Subtype::UiBlocks,
        confidence: 97.0,
        reason: "色块 + 人工边缘 + 颜色少",
        predicate: is_block_ui,
    },
    EliminationRule {
        name: "UI_GRID",
        tier: Tier::Absolute,
        subtype: Subtype::UiGrid,
        confidence: 96.0,
        reason: "网格结构 + 水平/竖直边缘",
        predicate: is_grid_ui,
    },
];

pub static CROSS_VALIDATION_RULES: &[EliminationRule] = &[
    EliminationRule {
        name: "PHOTO_NATURAL",
        tier: Tier::CrossValidation,
        subtype: Subtype::PhotoNatural,
        confidence: 96.0,
        reason: "自然 + 有机 + 随机纹理",
        predicate: is_natural_photo,
    },
    EliminationRule {
        name: "PHOTO_LOWCOLOR",
        tier: Tier::CrossValidation,
        subtype: Subtype::PhotoLowcolor,
        confidence: 95.0,
        reason: "自然纹理 + 有机 + 无色块",
        predicate: is_low_color_photo,
    },
    EliminationRule {
        name: "UI_STRUCTURED",
        tier: Tier::CrossValidation,
        subtype: Subtype::UiStructured,
        confidence: 95.0,
        reason: "人工边缘 + 色块 + 锐利",
        predicate: is_structured_ui,
    },
    EliminationRule {
        name: "LOGO_SIMPLE",
        tier: Tier::CrossValidation,
        subtype: Subtype::LogoSimple,
        confidence: 94.0,
        reason: "颜色少 + 平坦 + 边缘锐利",
        predicate: is_simple_logo,
    },
];

fn is_svg(_: &FeatureVector, meta: &FileMeta) -> bool {
    meta.mime_type.eq_ignore_ascii_case(SVG_MIME_TYPE)
}

fn has_screenshot_name(_: &FeatureVector, meta: &FileMeta) -> bool {
    meta.file_name
        .as_deref()
        .is_some_and(|name| SCREENSHOT_NAME_PATTERNS.is_match(name))
}

fn is_tiny_file(f: &FeatureVector, meta: &FileMeta) -> bool {
    f.width <= ICON_MAX_EDGE && f.height <= ICON_MAX_EDGE && meta.file_size < ICON_MAX_FILE_SIZE
}

fn is_flat_icon(f: &FeatureVector, _: &FileMeta) -> bool {
    f.unique_color_count <= 10 && f.flatness_ratio > 0.65 && f.megapixels < 0.1
}

fn is_flat_canvas(f: &FeatureVector, _: &FileMeta) -> bool {
    f.unique_color_count <= 16 && f.flatness_ratio > 0.9 && f.edge_density < 0.002
}

fn is_pure_line_art(f: &FeatureVector, _: &FileMeta) -> bool {
    f.unique_color_count <= 32
        && f.edge_density > 0.012
        && f.texture_score < 0.1
        && f.saturation_mean < 8.0
        && f.edge_sharpness > 0.6
}

fn is_block_ui(f: &FeatureVector, _: &FileMeta) -> bool {
    f.blockiness > 0.65
        && f.histogram_peakiness > 0.4
        && f.artificial_edge_ratio > 0.35
        && f.unique_color_count < 200
}

fn is_grid_ui(f: &FeatureVector, _: &FileMeta) -> bool {
    f.grid_score > 0.25 && f.edge_directionality > 0.7 && f.geometric_regularity > 0.2
}

fn is_natural_photo(f: &FeatureVector, _: &FileMeta) -> bool {
    f.naturalness > 0.4
        && f.texture_score > 0.2
        && f.organic_score > 0.5
        && f.edge_directionality < 0.45
        && f.artificial_edge_ratio < 0.25
        && f.unique_color_count > 300
}

fn is_low_color_photo(f: &FeatureVector, _: &FileMeta) -> bool {
    f.naturalness > 0.35
        && f.texture_score > 0.25
        && f.texture_coherence < 5.0
        && f.organic_score > 0.55
        && f.blockiness < 0.3
        && f.grid_score < 0.15
}

fn is_structured_ui(f: &FeatureVector, _: &FileMeta) -> bool {
    f.artificial_edge_ratio > 0.4
        && f.blockiness > 0.5
        && f.edge_sharpness > 0.55
        && f.naturalness < 0.25
}

fn is_simple_logo(f: &FeatureVector, _: &FileMeta) -> bool {
    f.unique_color_count < 50
        && f.flatness_ratio > 0.55
        && f.dominant_color_ratio > 0.25
        && f.edge_sharpness > 0.5
}
