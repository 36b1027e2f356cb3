//! # 特征提取模块
//!
//! ## 设计思路
//!
//! 在原图上铺 N×N 网格（默认 9×9 = 81 个区域），每个区域左上角取一个采样方块，
//! 对采样像素计算颜色、饱和度/色相、Sobel 边缘、亮度方差与行内梯度统计，
//! 最后聚合为一份只读的 `FeatureVector`，供分类器与预算规划共享。
//!
//! ## 实现思路
//!
//! - 有效网格边长 = min(N, 宽, 高)，保证每个区域至少 1 像素。
//! - 采样边长 = clamp(floor(0.75 × 区域短边), min, max)，再裁剪到区域尺寸。
//! - 颜色量化：全局/区域键按通道 /8（32768 桶，直接用数组计数），局部键按 /16（4096 位集合）。
//! - 所有比值的分母都做了零值保护；退化图（1 像素、纯色）不会出现 NaN。
//! - 比值类字段落在 [0,1]；`texture_coherence`、`gradient_smoothness`、
//!   `center_weight_score`、`corner_density`、计数类字段不做归一化。

use image::RgbaImage;
use serde::Serialize;

use super::ReencodeConfig;

const COLOR_BUCKETS: usize = 1 << 15;
const LOCAL_COLOR_WORDS: usize = (1 << 12) / 64;
const HUE_BINS: usize = 12;

const STRONG_EDGE: f64 = 30.0;
const DENSITY_EDGE: f64 = 40.0;
const SHARP_EDGE: f64 = 80.0;
const SMOOTH_EDGE: f64 = 50.0;
const CORNER_GRADIENT: f64 = 50.0;
/// 与坐标轴夹角在该范围内的强边缘计为水平/竖直边缘（度）。
const AXIS_TOLERANCE_DEG: f64 = 11.25;

const FLAT_STD_DEV: f64 = 8.0;
const FLAT_ENTROPY: f64 = 3.0;
const FLAT_LOCAL_COLORS: u32 = 8;
const BLOCK_LOCAL_COLORS: u32 = 5;
const BLOCK_STD_DEV: f64 = 15.0;
const GRID_LOCAL_COLOR_JUMP: u32 = 10;
const SYMMETRY_COLOR_DIFF: u32 = 5;

/// 图像内容特征向量。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    // 基础
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub megapixels: f64,
    pub region_count: u32,
    pub sampled_pixels: u64,

    // 颜色
    pub unique_color_count: u32,
    pub dominant_color_ratio: f64,
    pub histogram_peakiness: f64,
    /// 区域亮度熵均值（bit，0~8）。
    pub color_entropy: f64,
    /// 饱和度均值（0~100）。
    pub saturation_mean: f64,
    pub saturation_std_dev: f64,
    /// 亮度极差（0~255）。
    pub brightness_range: f64,
    pub hue_diversity: f64,

    // 纹理
    pub texture_score: f64,
    pub texture_coherence: f64,
    pub noise_level: f64,
    pub local_variation: f64,
    pub micro_detail_density: f64,

    // 边缘
    pub edge_density: f64,
    pub edge_sharpness: f64,
    pub edge_uniformity: f64,
    pub edge_directionality: f64,
    /// 每 10000 个采样像素中的角点数。
    pub corner_density: f64,

    // 几何结构
    pub pattern_repetition: f64,
    pub geometric_regularity: f64,
    pub blockiness: f64,
    pub grid_score: f64,
    pub symmetry_score: f64,

    // 自然 / 人工
    pub naturalness: f64,
    pub organic_score: f64,
    pub artificial_edge_ratio: f64,

    // 空间分布
    pub flatness_ratio: f64,
    pub region_consistency: f64,
    pub center_weight_score: f64,
    pub color_block_ratio: f64,
    pub gradient_smoothness: f64,

    // 透明度
    pub has_transparency: bool,
    pub transparency_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionStats {
    std_dev: f64,
    entropy: f64,
    color_count: u32,
    local_color_count: u32,
    edge_mean: f64,
}

/// 流式累加器：均值与方差（总体方差）。
#[derive(Debug, Default, Clone, Copy)]
struct Moments {
    count: u64,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// 饱和度（0~100）与色相（0~360）。
fn saturation_and_hue(r: u8, g: u8, b: u8) -> (f64, f64) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let saturation = if max == 0.0 { 0.0 } else { (max - min) / max * 100.0 };

    if max == min {
        return (saturation, 0.0);
    }

    let delta = max - min;
    let sector = if max == r {
        ((g - b) / delta + 6.0) % 6.0
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (saturation, sector * 60.0)
}

fn color_key(r: u8, g: u8, b: u8) -> usize {
    ((r as usize >> 3) << 10) | ((g as usize >> 3) << 5) | (b as usize >> 3)
}

fn local_color_key(r: u8, g: u8, b: u8) -> usize {
    ((r as usize >> 4) << 8) | ((g as usize >> 4) << 4) | (b as usize >> 4)
}

/// 全局累加状态（跨区域）。
struct Accumulator {
    global_colors: Vec<u32>,
    region_color_stamp: Vec<u32>,
    hue_bins: [u64; HUE_BINS],
    saturation: Moments,
    edges: Moments,
    gradients: Moments,
    min_brightness: u8,
    max_brightness: u8,
    strong_density_edges: u64,
    horizontal_edges: u64,
    vertical_edges: u64,
    diagonal_edges: u64,
    sharp_edges: u64,
    smooth_edges: u64,
    corners: u64,
    micro_gradients: u64,
    noise_gradients: u64,
    transparent_pixels: u64,
    sampled_pixels: u64,
    flat_regions: u32,
    block_regions: u32,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            global_colors: vec![0; COLOR_BUCKETS],
            region_color_stamp: vec![0; COLOR_BUCKETS],
            hue_bins: [0; HUE_BINS],
            saturation: Moments::default(),
            edges: Moments::default(),
            gradients: Moments::default(),
            min_brightness: u8::MAX,
            max_brightness: 0,
            strong_density_edges: 0,
            horizontal_edges: 0,
            vertical_edges: 0,
            diagonal_edges: 0,
            sharp_edges: 0,
            smooth_edges: 0,
            corners: 0,
            micro_gradients: 0,
            noise_gradients: 0,
            transparent_pixels: 0,
            sampled_pixels: 0,
            flat_regions: 0,
            block_regions: 0,
        }
    }

    /// 处理一个采样方块，返回区域统计。
    ///
    /// `stamp` 从 1 开始递增，用于在不清空数组的情况下统计区域内去重颜色。
    fn sample_region(
        &mut self,
        bitmap: &RgbaImage,
        origin: (u32, u32),
        size: (u32, u32),
        stamp: u32,
    ) -> RegionStats {
        let (ox, oy) = origin;
        let (sw, sh) = size;
        let pixel_count = (sw as usize) * (sh as usize);

        let mut histogram = [0u32; 256];
        let mut local_colors = [0u64; LOCAL_COLOR_WORDS];
        let mut region_colors = 0u32;
        let mut brightness = Moments::default();
        let mut lumas = Vec::with_capacity(pixel_count);

        for y in 0..sh {
            let mut prev_mean: Option<f64> = None;
            for x in 0..sw {
                let [r, g, b, a] = bitmap.get_pixel(ox + x, oy + y).0;

                let exact_luma = luma(r, g, b);
                lumas.push(exact_luma);
                let gray = exact_luma.floor().clamp(0.0, 255.0) as u8;
                histogram[gray as usize] += 1;
                brightness.push(gray as f64);
                self.min_brightness = self.min_brightness.min(gray);
                self.max_brightness = self.max_brightness.max(gray);

                let key = color_key(r, g, b);
                self.global_colors[key] += 1;
                if self.region_color_stamp[key] != stamp {
                    self.region_color_stamp[key] = stamp;
                    region_colors += 1;
                }
                let local = local_color_key(r, g, b);
                local_colors[local / 64] |= 1 << (local % 64);

                let (saturation, hue) = saturation_and_hue(r, g, b);
                self.saturation.push(saturation);
                let bin = ((hue / 30.0).floor() as usize).min(HUE_BINS - 1);
                self.hue_bins[bin] += 1;

                if a < u8::MAX {
                    self.transparent_pixels += 1;
                }

                let mean_rgb = (r as f64 + g as f64 + b as f64) / 3.0;
                if let Some(prev) = prev_mean {
                    let diff = (mean_rgb - prev).abs();
                    self.gradients.push(diff);
                    if diff > 0.0 && diff < 10.0 {
                        self.micro_gradients += 1;
                    }
                    if diff > 0.0 && diff < 5.0 {
                        self.noise_gradients += 1;
                    }
                }
                prev_mean = Some(mean_rgb);
            }
        }

        let mut region_edges = Moments::default();
        if sw >= 3 && sh >= 3 {
            let w = sw as usize;
            let at = |x: usize, y: usize| lumas[y * w + x];
            for y in 1..(sh as usize - 1) {
                for x in 1..(w - 1) {
                    let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2.0 * at(x - 1, y)
                        + 2.0 * at(x + 1, y)
                        - at(x - 1, y + 1)
                        + at(x + 1, y + 1);
                    let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                        + at(x - 1, y + 1)
                        + 2.0 * at(x, y + 1)
                        + at(x + 1, y + 1);

                    let magnitude = (gx * gx + gy * gy).sqrt();
                    region_edges.push(magnitude);
                    self.edges.push(magnitude);

                    if magnitude > DENSITY_EDGE {
                        self.strong_density_edges += 1;
                    }

                    if magnitude > STRONG_EDGE {
                        let angle = gy.atan2(gx).to_degrees().abs();
                        if angle < AXIS_TOLERANCE_DEG || angle > 180.0 - AXIS_TOLERANCE_DEG {
                            self.horizontal_edges += 1;
                        } else if (angle - 90.0).abs() < AXIS_TOLERANCE_DEG {
                            self.vertical_edges += 1;
                        } else {
                            self.diagonal_edges += 1;
                        }

                        if magnitude > SHARP_EDGE {
                            self.sharp_edges += 1;
                        } else if magnitude < SMOOTH_EDGE {
                            self.smooth_edges += 1;
                        }
                    }

                    if gx.abs() > CORNER_GRADIENT && gy.abs() > CORNER_GRADIENT {
                        self.corners += 1;
                    }
                }
            }
        }

        let mut entropy = 0.0;
        for &count in histogram.iter().filter(|count| **count > 0) {
            let p = count as f64 / pixel_count as f64;
            entropy -= p * p.log2();
        }

        let local_color_count: u32 = local_colors.iter().map(|word| word.count_ones()).sum();
        let std_dev = brightness.std_dev();

        if std_dev < FLAT_STD_DEV && entropy < FLAT_ENTROPY && local_color_count < FLAT_LOCAL_COLORS {
            self.flat_regions += 1;
        }
        if local_color_count <= BLOCK_LOCAL_COLORS && std_dev < BLOCK_STD_DEV {
            self.block_regions += 1;
        }

        self.sampled_pixels += pixel_count as u64;

        RegionStats {
            std_dev,
            entropy,
            color_count: region_colors,
            local_color_count,
            edge_mean: region_edges.mean(),
        }
    }
}

/// 分析位图内容，产出特征向量。
///
/// 在原图上只执行一次；档位缩放不会重新分析。
pub fn analyze(bitmap: &RgbaImage, config: &ReencodeConfig) -> FeatureVector {
    let (width, height) = bitmap.dimensions();
    let grid = config.grid_size.max(1).min(width.max(1)).min(height.max(1));

    let mut acc = Accumulator::new();
    let mut regions: Vec<RegionStats> = Vec::with_capacity((grid * grid) as usize);

    if width > 0 && height > 0 {
        let region_w = width / grid;
        let region_h = height / grid;
        let side = ((region_w.min(region_h) as f64 * 0.75).floor() as u32)
            .clamp(config.min_sample_size, config.max_sample_size.max(config.min_sample_size));
        let sample = (side.min(region_w).max(1), side.min(region_h).max(1));

        for index in 0..grid * grid {
            let origin = ((index % grid) * region_w, (index / grid) * region_h);
            regions.push(acc.sample_region(bitmap, origin, sample, index + 1));
        }
    }

    aggregate(width, height, grid, &acc, &regions)
}

fn aggregate(
    width: u32,
    height: u32,
    grid: u32,
    acc: &Accumulator,
    regions: &[RegionStats],
) -> FeatureVector {
    let region_count = regions.len() as f64;
    let sampled = acc.sampled_pixels as f64;

    // 颜色
    let mut color_counts: Vec<u32> = acc.global_colors.iter().copied().filter(|c| *c > 0).collect();
    color_counts.sort_unstable_by(|a, b| b.cmp(a));
    let unique_color_count = color_counts.len() as u32;
    let top1 = color_counts.first().copied().unwrap_or(0) as f64;
    let top5: f64 = color_counts.iter().take(5).map(|c| *c as f64).sum();

    let mean_of = |f: fn(&RegionStats) -> f64| -> f64 {
        ratio(regions.iter().map(f).sum::<f64>(), region_count)
    };
    let std_of = |f: fn(&RegionStats) -> f64| -> f64 {
        let mut m = Moments::default();
        regions.iter().for_each(|r| m.push(f(r)));
        m.std_dev()
    };

    let color_entropy = mean_of(|r| r.entropy);
    let brightness_range = if acc.sampled_pixels == 0 {
        0.0
    } else {
        (acc.max_brightness - acc.min_brightness) as f64
    };
    let hue_diversity = acc.hue_bins.iter().filter(|b| **b > 0).count() as f64 / HUE_BINS as f64;

    // 边缘与纹理
    let edge_count = acc.edges.count as f64;
    let edge_density = unit(ratio(acc.strong_density_edges as f64, edge_count));
    let texture_score = unit(acc.edges.mean() / 255.0);
    let edge_uniformity = unit(1.0 - acc.edges.std_dev() / 255.0);
    let edge_sharpness = unit(
        acc.sharp_edges as f64 / (acc.sharp_edges + acc.smooth_edges + 1) as f64,
    );
    let directional_total = (acc.horizontal_edges + acc.vertical_edges + acc.diagonal_edges) as f64;
    let edge_directionality = unit(ratio(
        (acc.horizontal_edges + acc.vertical_edges) as f64,
        directional_total,
    ));
    let corner_density = ratio(acc.corners as f64 * 10_000.0, sampled);

    let texture_coherence = mean_of(|r| r.edge_mean) / (std_of(|r| r.edge_mean) + 1.0);

    let gradient_count = acc.gradients.count as f64;
    let micro_detail_density = unit(ratio(acc.micro_gradients as f64, gradient_count));
    let noise_level = unit(ratio(acc.noise_gradients as f64, gradient_count));

    // 几何结构
    let pattern_repetition = unit(1.0 / (1.0 + std_of(|r| r.entropy)));
    let geometric_regularity = unit(edge_density * edge_uniformity * edge_directionality);
    let blockiness = unit(ratio(acc.block_regions as f64, region_count));

    let n = grid as usize;
    let mut gridness = 0u32;
    let mut symmetric_pairs = 0u32;
    let mid = n / 2;
    if regions.len() == n * n {
        for y in 0..n {
            for x in 0..n.saturating_sub(1) {
                let idx = y * n + x;
                if regions[idx]
                    .local_color_count
                    .abs_diff(regions[idx + 1].local_color_count)
                    > GRID_LOCAL_COLOR_JUMP
                {
                    gridness += 1;
                }
            }
            for x in 0..mid {
                let left = regions[y * n + x].color_count;
                let right = regions[y * n + (n - 1 - x)].color_count;
                if left.abs_diff(right) < SYMMETRY_COLOR_DIFF {
                    symmetric_pairs += 1;
                }
            }
        }
    }
    let grid_score = unit(ratio(gridness as f64, (n * n) as f64));
    let symmetry_score = unit(ratio(symmetric_pairs as f64, (n * mid) as f64));

    // 自然 / 人工
    let local_variation = unit(mean_of(|r| r.std_dev) / 255.0);
    let naturalness = unit(
        local_variation * 0.3
            + noise_level * 0.25
            + (1.0 - pattern_repetition) * 0.25
            + (1.0 - edge_directionality) * 0.2,
    );
    let organic_score = unit(1.0 - edge_directionality);
    let artificial_edge_ratio = unit(edge_sharpness * edge_directionality);

    // 空间分布
    let gradient_smoothness = acc.gradients.mean() / (acc.gradients.std_dev() + 1.0);
    let flatness_ratio = unit(ratio(acc.flat_regions as f64, region_count));
    let color_changes: u64 = regions
        .windows(2)
        .map(|pair| pair[1].color_count.abs_diff(pair[0].color_count) as u64)
        .sum();
    let region_consistency = unit(1.0 - ratio(color_changes as f64, region_count * 50.0));

    let center_start = n / 3;
    let center_end = (2 * n).div_ceil(3);
    let mut center = Moments::default();
    if regions.len() == n * n {
        for y in center_start..center_end {
            for x in center_start..center_end {
                center.push(regions[y * n + x].edge_mean);
            }
        }
    }
    let center_weight_score = center.mean() / (mean_of(|r| r.edge_mean) + 1.0);

    let transparency_ratio = unit(ratio(acc.transparent_pixels as f64, sampled));

    FeatureVector {
        width,
        height,
        aspect_ratio: ratio(width as f64, height as f64),
        megapixels: width as f64 * height as f64 / 1_000_000.0,
        region_count: regions.len() as u32,
        sampled_pixels: acc.sampled_pixels,

        unique_color_count,
        dominant_color_ratio: unit(ratio(top1, sampled)),
        histogram_peakiness: unit(ratio(top5, sampled)),
        color_entropy,
        saturation_mean: acc.saturation.mean(),
        saturation_std_dev: acc.saturation.std_dev(),
        brightness_range,
        hue_diversity,

        texture_score,
        texture_coherence,
        noise_level,
        local_variation,
        micro_detail_density,

        edge_density,
        edge_sharpness,
        edge_uniformity,
        edge_directionality,
        corner_density,

        pattern_repetition,
        geometric_regularity,
        blockiness,
        grid_score,
        symmetry_score,

        naturalness,
        organic_score,
        artificial_edge_ratio,

        flatness_ratio,
        region_consistency,
        center_weight_score,
        color_block_ratio: blockiness,
        gradient_smoothness,

        has_transparency: acc.transparent_pixels > 0,
        transparency_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn ratio_fields(f: &FeatureVector) -> Vec<(&'static str, f64)> {
        vec![
            ("dominant_color_ratio", f.dominant_color_ratio),
            ("histogram_peakiness", f.histogram_peakiness),
            ("hue_diversity", f.hue_diversity),
            ("texture_score", f.texture_score),
            ("noise_level", f.noise_level),
            ("local_variation", f.local_variation),
            ("micro_detail_density", f.micro_detail_density),
            ("edge_density", f.edge_density),
            ("edge_sharpness", f.edge_sharpness),
            ("edge_uniformity", f.edge_uniformity),
            ("edge_directionality", f.edge_directionality),
            ("pattern_repetition", f.pattern_repetition),
            ("geometric_regularity", f.geometric_regularity),
            ("blockiness", f.blockiness),
            ("grid_score", f.grid_score),
            ("symmetry_score", f.symmetry_score),
            ("naturalness", f.naturalness),
            ("organic_score", f.organic_score),
            ("artificial_edge_ratio", f.artificial_edge_ratio),
            ("flatness_ratio", f.flatness_ratio),
            ("region_consistency", f.region_consistency),
            ("color_block_ratio", f.color_block_ratio),
            ("transparency_ratio", f.transparency_ratio),
        ]
    }

    fn assert_well_formed(f: &FeatureVector) {
        for (name, value) in ratio_fields(f) {
            assert!(value.is_finite(), "{} is not finite", name);
            assert!((0.0..=1.0).contains(&value), "{} out of range: {}", name, value);
        }
        for value in [
            f.texture_coherence,
            f.gradient_smoothness,
            f.center_weight_score,
            f.corner_density,
            f.color_entropy,
            f.saturation_mean,
            f.saturation_std_dev,
        ] {
            assert!(value.is_finite() && value >= 0.0);
        }
    }

    fn noisy(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
            h ^= h >> 15;
            h = h.wrapping_mul(0x2C1B_3C6D);
            h ^= h >> 12;
            h = h.wrapping_mul(0x297A_2D39);
            h ^= h >> 15;
            Rgba([(h & 0xFF) as u8, ((h >> 8) & 0xFF) as u8, ((h >> 16) & 0xFF) as u8, 255])
        })
    }

    #[test]
    fn single_pixel_image_is_safe() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let f = analyze(&img, &ReencodeConfig::default());
        assert_eq!(f.region_count, 1);
        assert_eq!(f.sampled_pixels, 1);
        assert_eq!(f.unique_color_count, 1);
        assert_eq!(f.edge_density, 0.0);
        assert_well_formed(&f);
    }

    #[test]
    fn tiny_black_image_is_flat() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let f = analyze(&img, &ReencodeConfig::default());
        assert_eq!(f.region_count, 81);
        assert_eq!(f.unique_color_count, 1);
        assert_eq!(f.flatness_ratio, 1.0);
        assert_eq!(f.brightness_range, 0.0);
        assert_well_formed(&f);
    }

    #[test]
    fn uniform_canvas_is_flat_and_edgeless() {
        let img = RgbaImage::from_pixel(400, 300, Rgba([200, 200, 200, 255]));
        let f = analyze(&img, &ReencodeConfig::default());
        assert_eq!(f.flatness_ratio, 1.0);
        assert_eq!(f.edge_density, 0.0);
        assert_eq!(f.dominant_color_ratio, 1.0);
        assert_eq!(f.blockiness, 1.0);
        assert!(!f.has_transparency);
        assert_well_formed(&f);
    }

    #[test]
    fn noise_is_textured_and_colourful() {
        let f = analyze(&noisy(900, 900), &ReencodeConfig::default());
        assert!(f.unique_color_count > 5000);
        assert!(f.texture_score > 0.2);
        assert!(f.edge_density > 0.5);
        assert!(f.flatness_ratio < 0.05);
        assert!(f.edge_directionality < 0.5);
        assert_well_formed(&f);
    }

    #[test]
    fn axis_aligned_stripes_are_directional() {
        let img = RgbaImage::from_fn(900, 900, |x, _| {
            if (x / 6) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let f = analyze(&img, &ReencodeConfig::default());
        assert!(f.edge_directionality > 0.95);
        assert!(f.unique_color_count <= 2);
        assert_well_formed(&f);
    }

    #[test]
    fn transparency_is_measured_on_samples() {
        let img = RgbaImage::from_fn(90, 90, |x, _| {
            if x < 45 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let f = analyze(&img, &ReencodeConfig::default());
        assert!(f.has_transparency);
        assert!(f.transparency_ratio > 0.3 && f.transparency_ratio < 0.7);
    }

    #[test]
    fn analysis_is_deterministic() {
        let img = noisy(300, 200);
        let config = ReencodeConfig::default();
        assert_eq!(analyze(&img, &config), analyze(&img, &config));
    }

    #[test]
    fn smaller_grid_samples_fewer_regions() {
        let mut config = ReencodeConfig::default();
        config.grid_size = 6;
        let f = analyze(&noisy(300, 300), &config);
        assert_eq!(f.region_count, 36);
    }
}
