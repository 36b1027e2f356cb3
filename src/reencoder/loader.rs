//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Base64 / 内存字节）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - Base64：格式解析 + 预估解码体积限制。
//! - 所有来源最后都经过同一套签名嗅探：
//!   - 空内容 / 无法识别 → `Decode`
//!   - SVG、动图 GIF（可解析出第二帧）→ `UnsupportedFormat`（调用方可另行路由）
//!   - 其它非静态位图 → `UnsupportedFormat`

use base64::{Engine as _, engine::general_purpose};
use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;
use std::io::Cursor;
use std::path::Path;

use super::source::{ImageSource, RawImageData};
use super::{ReencodeConfig, ReencodeError, Reencoder};

/// 支持自适应重编码的静态位图类型（以 `infer` 的 MIME 命名为准）。
const SUPPORTED_STILL_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/gif",
    "image/tiff",
    "image/vnd.microsoft.icon",
];

pub const SVG_MIME_TYPE: &str = "image/svg+xml";
const SVG_PROBE_BYTES: usize = 1024;

impl Reencoder {
    /// 按来源加载原始字节并完成签名校验。
    pub(super) fn load_source(
        &self,
        source: ImageSource,
        config: &ReencodeConfig,
    ) -> Result<RawImageData, ReencodeError> {
        match source {
            ImageSource::FilePath(path) => Self::load_from_file(&path, config),
            ImageSource::Base64(data) => Self::load_from_base64(&data, config),
            ImageSource::Bytes { bytes, file_name } => {
                Self::load_from_bytes(bytes, file_name, "memory", config)
            }
        }
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(
        path: &str,
        config: &ReencodeConfig,
    ) -> Result<RawImageData, ReencodeError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ReencodeError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ReencodeError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(ReencodeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ReencodeError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Self::load_from_bytes(bytes, file_name, "file", config)
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        data: &str,
        config: &ReencodeConfig,
    ) -> Result<RawImageData, ReencodeError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;
        Self::load_from_bytes(bytes, None, "base64", config)
    }

    /// 内存字节入口：体积限制 + 签名嗅探。
    pub(super) fn load_from_bytes(
        bytes: Vec<u8>,
        file_name: Option<String>,
        source_hint: &'static str,
        config: &ReencodeConfig,
    ) -> Result<RawImageData, ReencodeError> {
        if bytes.len() as u64 > config.max_file_size {
            return Err(ReencodeError::ResourceLimit(format!(
                "输入体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let mime_type = Self::sniff_still_image(&bytes)?;

        Ok(RawImageData {
            bytes,
            mime_type: mime_type.to_string(),
            file_name,
            source_hint,
        })
    }

    /// 通过魔数识别图片类型，并拒绝不在自适应编码范围内的格式。
    pub(crate) fn sniff_still_image(bytes: &[u8]) -> Result<&'static str, ReencodeError> {
        if bytes.is_empty() {
            return Err(ReencodeError::Decode("图片内容为空".to_string()));
        }

        if Self::looks_like_svg(bytes) {
            return Err(ReencodeError::UnsupportedFormat(format!(
                "{}：矢量图不参与自适应重编码",
                SVG_MIME_TYPE
            )));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ReencodeError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ReencodeError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        let mime_type = kind.mime_type();
        if !SUPPORTED_STILL_MIME_TYPES.contains(&mime_type) {
            return Err(ReencodeError::UnsupportedFormat(format!(
                "{}：暂不支持该图片格式",
                mime_type
            )));
        }

        if mime_type == "image/gif" && Self::is_animated_gif(bytes) {
            return Err(ReencodeError::UnsupportedFormat(
                "image/gif：多帧动图不参与自适应重编码".to_string(),
            ));
        }

        Ok(mime_type)
    }

    fn looks_like_svg(bytes: &[u8]) -> bool {
        let probe = &bytes[..bytes.len().min(SVG_PROBE_BYTES)];
        let Ok(text) = std::str::from_utf8(probe) else {
            return false;
        };
        let head = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
        head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
    }

    /// 按块结构解析帧，能读出第二帧即为动图。
    ///
    /// 头部无法解析时按静态图处理，由解码阶段报告具体错误。
    fn is_animated_gif(bytes: &[u8]) -> bool {
        let Ok(decoder) = GifDecoder::new(Cursor::new(bytes)) else {
            return false;
        };
        decoder
            .into_frames()
            .take(2)
            .filter(|frame| frame.is_ok())
            .count()
            > 1
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ReencodeError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ReencodeError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ReencodeError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    pub(crate) fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, ReencodeError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:image/") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| ReencodeError::Decode("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(ReencodeError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| ReencodeError::Decode(format!("Base64 解码失败：{}", e)))
    }
}
