//! 第四层加权评分表。
//!
//! 每个类别一个评分函数，记录每个非零奖惩项，`trace()` 即分类理由。
//! 表内顺序同时是平分时的优先顺序。

use super::{Category, Subtype};
use crate::reencoder::features::FeatureVector;

/// 单个类别的评分明细。
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub category: Category,
    pub total: f64,
    pub terms: Vec<(&'static str, f64)>,
}

impl ScoreCard {
    fn new(category: Category) -> Self {
        Self {
            category,
            total: 0.0,
            terms: Vec::new(),
        }
    }

    fn add(&mut self, term: &'static str, value: f64) {
        if value != 0.0 {
            self.total += value;
            self.terms.push((term, value));
        }
    }

    fn add_if(&mut self, condition: bool, term: &'static str, value: f64) {
        if condition {
            self.add(term, value);
        }
    }

    /// 评分轨迹，例如 `PHOTO=121 [Nat:31, Col:35, Org:20]`。
    pub fn trace(&self) -> String {
        let terms = self
            .terms
            .iter()
            .map(|(term, value)| format!("{}:{:.0}", term, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}={:.0} [{}]", self.category.as_str(), self.total, terms)
    }
}

pub type Scorer = fn(&FeatureVector) -> ScoreCard;

pub static SCORERS: &[(Category, Scorer)] = &[
    (Category::Photo, score_photo),
    (Category::LineArt, score_line_art),
    (Category::Logo, score_logo),
    (Category::Ui, score_ui),
    (Category::Screenshot, score_screenshot),
    (Category::Graphic, score_graphic),
];

/// 按表顺序计算所有类别得分。
pub fn score_all(f: &FeatureVector) -> Vec<ScoreCard> {
    SCORERS.iter().map(|(_, scorer)| scorer(f)).collect()
}

fn score_photo(f: &FeatureVector) -> ScoreCard {
    let mut card = ScoreCard::new(Category::Photo);
    card.add("Nat", f.naturalness * 120.0);

    let colors = f.unique_color_count;
    let color_bonus = if colors > 1500 {
        35.0
    } else if colors > 800 {
        25.0
    } else if colors > 400 {
        15.0
    } else {
        0.0
    };
    card.add("Col", color_bonus);

    let texture_bonus = if f.texture_score > 0.25 {
        25.0
    } else if f.texture_score > 0.15 {
        15.0
    } else {
        0.0
    };
    card.add("Tex", texture_bonus);

    card.add_if(f.organic_score > 0.5, "Org", 20.0);
    card.add_if(f.saturation_std_dev > 15.0, "SatVar", 15.0);
    card.add_if(f.hue_diversity > 0.4, "HueDiv", 15.0);
    card.add_if(f.noise_level > 0.25, "Noise", 12.0);
    card.add_if(f.center_weight_score > 1.15, "Center", 10.0);
    card.add_if(f.blockiness > 0.5, "Block", -40.0);
    card.add_if(f.artificial_edge_ratio > 0.4, "ArtEdge", -35.0);
    card.add_if(f.grid_score > 0.2, "Grid", -30.0);
    card
}

fn score_line_art(f: &FeatureVector) -> ScoreCard {
    let mut card = ScoreCard::new(Category::LineArt);
    let colors = f.unique_color_count;
    if colors < 50 {
        card.add("Col", 45.0);
    } else if colors < 100 {
        card.add("Col", 25.0);
    }
    card.add_if(f.edge_density > 0.01, "Edge", 35.0);
    card.add_if(f.texture_score < 0.12, "NoTex", 30.0);
    card.add_if(f.saturation_mean < 12.0, "LowSat", 25.0);
    card.add_if(f.edge_sharpness > 0.6, "Sharp", 20.0);
    card
}

fn score_logo(f: &FeatureVector) -> ScoreCard {
    let mut card = ScoreCard::new(Category::Logo);
    if f.unique_color_count < 150 {
        card.add("Col", (60.0 - f.unique_color_count as f64 / 2.5).max(0.0));
    }
    card.add_if(f.flatness_ratio > 0.5, "Flat", f.flatness_ratio * 35.0);
    card.add_if(
        f.edge_density > 0.005 && f.edge_density < 0.08,
        "Edge",
        25.0,
    );
    card.add_if(f.dominant_color_ratio > 0.3, "Dom", 20.0);
    card.add_if(f.symmetry_score > 0.6, "Sym", 15.0);
    card.add_if(f.texture_score > 0.2, "TexPen", -30.0);
    card
}

fn score_ui(f: &FeatureVector) -> ScoreCard {
    let mut card = ScoreCard::new(Category::Ui);
    card.add_if(
        f.artificial_edge_ratio > 0.15,
        "ArtEdge",
        f.artificial_edge_ratio * 100.0,
    );
    card.add_if(f.blockiness > 0.3, "Block", f.blockiness * 50.0);
    card.add_if(f.edge_sharpness > 0.5, "Sharp", 25.0);
    card.add_if(f.grid_score > 0.1, "Grid", f.grid_score * 80.0);
    card.add_if(f.texture_score < 0.18, "NoTex", 20.0);
    card.add_if(f.histogram_peakiness > 0.3, "Peaks", 15.0);
    card.add_if(f.naturalness > 0.35, "NatPen", -50.0);
    card
}

/// 截图：继承界面得分的 0.85，再给极端宽高比加分。
fn score_screenshot(f: &FeatureVector) -> ScoreCard {
    let ui = score_ui(f);
    let mut card = ScoreCard::new(Category::Screenshot);
    card.add("UI×0.85", ui.total * 0.85);
    card.add_if(
        f.aspect_ratio > 1.5 || f.aspect_ratio < 0.6,
        "Aspect",
        15.0,
    );
    card
}

fn score_graphic(f: &FeatureVector) -> ScoreCard {
    let mut card = ScoreCard::new(Category::Graphic);
    card.add_if(
        f.unique_color_count > 50 && f.unique_color_count < 1000,
        "MidCol",
        35.0,
    );
    card.add_if(f.texture_score < 0.22, "LowTex", 30.0);
    card.add_if(
        f.saturation_mean > 20.0 && f.saturation_std_dev < 25.0,
        "SimpSat",
        25.0,
    );
    card.add_if(f.gradient_smoothness > 0.5, "SmoothGrad", 15.0);
    card.add_if(f.naturalness > 0.4, "NatPen", -30.0);
    card
}

/// 评分胜出后的子类型推导。
pub(super) fn derive_subtype(category: Category, f: &FeatureVector) -> Subtype {
    match category {
        Category::Photo => {
            if f.naturalness > 0.4 && f.organic_score > 0.5 {
                Subtype::PhotoNatural
            } else if f.center_weight_score > 1.2 && f.unique_color_count > 1000 {
                Subtype::PhotoPortrait
            } else if f.unique_color_count < 800 {
                Subtype::PhotoLowcolor
            } else {
                Subtype::PhotoGeneral
            }
        }
        Category::Ui => {
            if f.blockiness > 0.6 {
                Subtype::UiBlocks
            } else if f.grid_score > 0.2 {
                Subtype::UiGrid
            } else {
                Subtype::UiGeneral
            }
        }
        Category::Logo => {
            if f.unique_color_count < 50 {
                Subtype::LogoSimple
            } else {
                Subtype::LogoComplex
            }
        }
        Category::LineArt => Subtype::LineArtPure,
        Category::Screenshot => Subtype::Screenshot,
        Category::Graphic => Subtype::Graphic,
        Category::Icon => Subtype::IconSmall,
        Category::Vector => Subtype::Vector,
    }
}
