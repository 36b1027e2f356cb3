#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use adaptive_reencode::reencoder::{Codec, ProgressEvent, ReencodeError};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, Frame, ImageFormat, Rgba, RgbaImage};

/// 确定性整数哈希，用来生成可复现的“噪声”。
pub fn mix(x: u32, y: u32, channel: u32) -> u32 {
    let mut v = x.wrapping_mul(0x9E37_79B1)
        ^ y.wrapping_mul(0x85EB_CA77)
        ^ channel.wrapping_mul(0xC2B2_AE3D);
    v ^= v >> 15;
    v = v.wrapping_mul(0x2C1B_3C6D);
    v ^= v >> 12;
    v
}

/// 类照片：平滑渐变 + 每通道 ±40 的高频噪声。
pub fn photo_like(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let base = [
            x * 200 / width + 30,
            y * 180 / height + 40,
            (x + y) * 150 / (width + height) + 50,
        ];
        let mut pixel = [0u8; 4];
        for c in 0..3 {
            let noise = (mix(x, y, c as u32) % 81) as i32 - 40;
            pixel[c] = (base[c] as i32 + noise).clamp(0, 255) as u8;
        }
        pixel[3] = 255;
        Rgba(pixel)
    })
}

/// 三条相近的水平色带：量化后仍是 3 种颜色，色带交界处没有强边缘。
pub fn three_band_canvas(width: u32, height: u32) -> RgbaImage {
    let colors = [[200, 200, 200], [216, 200, 200], [200, 216, 200]];
    RgbaImage::from_fn(width, height, |_, y| {
        let [r, g, b] = colors[((y * 3 / height) as usize).min(2)];
        Rgba([r, g, b, 255])
    })
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode png fixture");
    cursor.into_inner()
}

pub fn jpeg_bytes(image: &RgbaImage, quality: u8) -> Vec<u8> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .expect("failed to encode jpeg fixture");
    buffer
}

/// 每个颜色一帧的 GIF。
pub fn gif_bytes(width: u32, height: u32, frames: &[Rgba<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder
            .encode_frames(
                frames
                    .iter()
                    .map(|color| Frame::new(RgbaImage::from_pixel(width, height, *color))),
            )
            .expect("failed to encode gif fixture");
    }
    bytes
}

/// 体积 = 像素数 × 质量 / 4 + 64，单调且确定，便于快速跑完整流水线。
pub struct AreaCodec;

impl Codec for AreaCodec {
    fn mime_type(&self) -> &'static str {
        "application/x-area"
    }

    fn extension(&self) -> &'static str {
        "bin"
    }

    fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError> {
        let pixels = image.width() as f64 * image.height() as f64;
        Ok(vec![0u8; (pixels * quality / 4.0) as usize + 64])
    }
}

/// 收集所有进度事件。
pub fn collecting_sink() -> (
    Arc<Mutex<Vec<ProgressEvent>>>,
    impl Fn(ProgressEvent) + Send + Sync + 'static,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let events = Arc::clone(&events);
        move |event: ProgressEvent| events.lock().expect("events lock").push(event)
    };
    (events, sink)
}
