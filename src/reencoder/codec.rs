//! # 编码器适配层
//!
//! `Codec` 是自适应编码器唯一依赖的接口：给定像素与 0~1 的质量，返回编码字节。
//! 二分搜索假设“质量越高、体积不减”；违反时搜索仍会结束，只是结果可能不是最优。

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ReencodeError;

/// 有损编码器。
pub trait Codec: Send + Sync {
    /// 输出 MIME 类型。
    fn mime_type(&self) -> &'static str;

    /// 输出文件扩展名（不含点）。
    fn extension(&self) -> &'static str;

    /// 以给定质量（0~1）编码。
    fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError>;
}

/// libwebp 有损编码（默认）。
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpCodec;

impl Codec for WebpCodec {
    fn mime_type(&self) -> &'static str {
        "image/webp"
    }

    fn extension(&self) -> &'static str {
        "webp"
    }

    fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError> {
        let (width, height) = image.dimensions();
        let encoder = webp::Encoder::from_rgba(image.as_raw(), width, height);
        let memory = encoder
            .encode_simple(false, (quality.clamp(0.0, 1.0) * 100.0) as f32)
            .map_err(|e| ReencodeError::Encode(format!("WebP 编码失败：{:?}", e)))?;
        Ok(memory.to_vec())
    }
}

/// 基线 JPEG 编码；透明像素先合成到白底。
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl JpegCodec {
    fn flatten_on_white(image: &RgbaImage) -> RgbImage {
        RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            let alpha = a as u16;
            let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
            image::Rgb([blend(r), blend(g), blend(b)])
        })
    }
}

impl Codec for JpegCodec {
    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }

    fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError> {
        let rgb = Self::flatten_on_white(image);
        let quality = ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).clamp(1, 100);

        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ReencodeError::Encode(format!("JPEG 编码失败：{}", e)))?;
        Ok(buffer)
    }
}

/// 可配置的内置编码器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Webp,
    Jpeg,
}

impl CodecKind {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Result<Self, ReencodeError> {
        match name.trim().to_lowercase().as_str() {
            "webp" => Ok(Self::Webp),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(ReencodeError::Config(format!(
                "未知编码器：{}（可选：webp / jpeg）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            Self::Webp => Arc::new(WebpCodec),
            Self::Jpeg => Arc::new(JpegCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        })
    }

    #[test]
    fn webp_output_has_riff_header() {
        let bytes = WebpCodec.encode(&sample(64, 48), 0.7).expect("webp encode");
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn jpeg_output_has_soi_marker_and_shrinks_with_quality() {
        let img = sample(128, 128);
        let high = JpegCodec.encode(&img, 0.95).expect("jpeg high");
        let low = JpegCodec.encode(&img, 0.1).expect("jpeg low");
        assert_eq!(&high[0..2], &[0xFF, 0xD8]);
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_flattens_transparency_on_white() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let rgb = JpegCodec::flatten_on_white(&img);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn codec_kind_parses_and_builds() {
        assert_eq!(CodecKind::from_str("JPG").expect("parse"), CodecKind::Jpeg);
        assert!(CodecKind::from_str("avif").is_err());
        assert_eq!(CodecKind::Webp.build().mime_type(), "image/webp");
        assert_eq!(CodecKind::Jpeg.build().extension(), "jpg");
    }
}
