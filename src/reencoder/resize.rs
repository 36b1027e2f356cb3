//! # 缩放模块
//!
//! ## 设计思路
//!
//! 尺寸计算与像素重采样分离：
//! - `compute_dimensions` 是纯函数，只依赖原图尺寸与档位上限，便于做性质测试；
//! - `resample` 负责真正的像素工作，优先走 `fast_image_resize`，失败回退 `image`。
//!
//! ## 级联缩放
//!
//! 开启 `cascade_resize` 时，编排器按 `max_dimension` 从大到小处理档位，
//! 上一档输出作为下一档的重采样源；但目标尺寸始终基于**原图尺寸**计算，
//! 避免逐级取整带来的宽高比漂移。级联与独立重采样的像素值会有细微差异。

use fast_image_resize as fr;
use image::RgbaImage;
use image::imageops::FilterType;

use super::ReencodeError;

/// 按最长边上限计算目标尺寸（不放大）。
///
/// 最长边压到 `max_dimension`，短边按比例四舍五入，最小为 1。
pub fn compute_dimensions(
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(u32, u32), ReencodeError> {
    if max_dimension == 0 {
        return Err(ReencodeError::InvalidDimension(
            "max_dimension 必须大于 0".to_string(),
        ));
    }
    if width == 0 || height == 0 {
        return Err(ReencodeError::Decode(format!(
            "源图尺寸无效：{}x{}",
            width, height
        )));
    }

    let longest = width.max(height);
    if longest <= max_dimension {
        return Ok((width, height));
    }

    let scale = max_dimension as f64 / longest as f64;
    let scaled = |edge: u32| -> u32 { ((edge as f64 * scale).round() as u32).clamp(1, max_dimension) };

    if width >= height {
        Ok((max_dimension, scaled(height)))
    } else {
        Ok((scaled(width), max_dimension))
    }
}

/// 将位图缩放到最长边不超过 `max_dimension`。
pub fn resize(
    bitmap: &RgbaImage,
    max_dimension: u32,
    filter: FilterType,
) -> Result<RgbaImage, ReencodeError> {
    validate_bitmap(bitmap)?;
    let (target_width, target_height) =
        compute_dimensions(bitmap.width(), bitmap.height(), max_dimension)?;
    resample(bitmap, target_width, target_height, filter)
}

/// 按给定目标尺寸重采样（级联时 `bitmap` 可能是上一档的输出）。
pub fn resample(
    bitmap: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ReencodeError> {
    validate_bitmap(bitmap)?;
    if target_width == 0 || target_height == 0 {
        return Err(ReencodeError::InvalidDimension(format!(
            "目标尺寸无效：{}x{}",
            target_width, target_height
        )));
    }

    if bitmap.dimensions() == (target_width, target_height) {
        return Ok(bitmap.clone());
    }

    match resize_with_fast_image_resize(bitmap, target_width, target_height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!(
                "⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}",
                err
            );
            Ok(image::imageops::resize(
                bitmap,
                target_width,
                target_height,
                filter,
            ))
        }
    }
}

fn validate_bitmap(bitmap: &RgbaImage) -> Result<(), ReencodeError> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(ReencodeError::Decode("源位图为空".to_string()));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if expected != Some(bitmap.as_raw().len()) {
        return Err(ReencodeError::Decode("源位图像素长度异常".to_string()));
    }
    Ok(())
}

fn resize_with_fast_image_resize(
    bitmap: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ReencodeError> {
    let (src_width, src_height) = bitmap.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        bitmap.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| ReencodeError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ReencodeError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ReencodeError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    #[test]
    fn never_upscales() {
        assert_eq!(compute_dimensions(300, 200, 864).expect("dims"), (300, 200));
        assert_eq!(compute_dimensions(864, 10, 864).expect("dims"), (864, 10));
    }

    #[test]
    fn landscape_and_portrait_clamp_longest_edge() {
        assert_eq!(compute_dimensions(4000, 3000, 864).expect("dims"), (864, 648));
        assert_eq!(compute_dimensions(3000, 4000, 864).expect("dims"), (648, 864));
        assert_eq!(compute_dimensions(2000, 2000, 1080).expect("dims"), (1080, 1080));
    }

    #[test]
    fn extreme_aspect_keeps_short_edge_at_least_one() {
        assert_eq!(compute_dimensions(10_000, 3, 100).expect("dims"), (100, 1));
    }

    #[test]
    fn zero_max_dimension_is_invalid() {
        assert!(matches!(
            compute_dimensions(100, 100, 0),
            Err(ReencodeError::InvalidDimension(_))
        ));
    }

    #[test]
    fn empty_bitmap_is_decode_error() {
        let empty = RgbaImage::new(0, 0);
        assert!(matches!(
            resize(&empty, 100, FilterType::CatmullRom),
            Err(ReencodeError::Decode(_))
        ));
    }

    #[test]
    fn resize_outputs_requested_buffer() {
        let src = gradient(400, 100);
        let out = resize(&src, 200, FilterType::CatmullRom).expect("resize");
        assert_eq!(out.dimensions(), (200, 50));
        assert_eq!(out.as_raw().len(), 200 * 50 * 4);
    }

    #[test]
    fn cascade_resample_hits_dimensions_from_original() {
        let src = gradient(2000, 1333);
        let large_dims = compute_dimensions(2000, 1333, 1080).expect("dims");
        let large = resample(&src, large_dims.0, large_dims.1, FilterType::Triangle).expect("large");

        let small_dims = compute_dimensions(2000, 1333, 480).expect("dims");
        let small = resample(&large, small_dims.0, small_dims.1, FilterType::Triangle).expect("small");
        assert_eq!(small.dimensions(), (480, 320));
    }

    proptest! {
        #[test]
        fn resize_invariant_holds(w in 1u32..6000, h in 1u32..6000, max in 1u32..2000) {
            let (tw, th) = compute_dimensions(w, h, max).expect("dims");
            prop_assert!(tw.max(th) <= max);
            prop_assert!(tw >= 1 && th >= 1);
            if w.max(h) <= max {
                prop_assert_eq!((tw, th), (w, h));
            } else if w >= h {
                let ideal = h as f64 * max as f64 / w as f64;
                prop_assert!((th as f64 - ideal).abs() <= 1.0);
            } else {
                let ideal = w as f64 * max as f64 / h as f64;
                prop_assert!((tw as f64 - ideal).abs() <= 1.0);
            }
        }
    }
}
