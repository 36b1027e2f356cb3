//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载、已嗅探但未解码的字节
//! - `SourceImage` 表示解码后的只读 RGBA 位图，整次任务内共享
//! - `FileMeta` 是分类器可见的文件元信息

use image::RgbaImage;
use serde::Serialize;

/// 图片输入来源。
pub enum ImageSource {
    /// 本地文件路径来源。
    FilePath(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 调用方已持有的内存字节。
    Bytes {
        bytes: Vec<u8>,
        file_name: Option<String>,
    },
}

impl ImageSource {
    /// 便捷构造：内存字节 + 可选文件名。
    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<&str>) -> Self {
        Self::Bytes {
            bytes,
            file_name: file_name.map(str::to_string),
        }
    }
}

/// 加载阶段输出：原始字节、嗅探结果与来源标识。
#[derive(Debug, Clone)]
pub struct RawImageData {
    /// 原始图片字节。
    pub bytes: Vec<u8>,
    /// 魔数嗅探得到的 MIME 类型。
    pub mime_type: String,
    /// 文件名（如有），用于分类器的文件名提示。
    pub file_name: Option<String>,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

impl RawImageData {
    pub fn meta(&self) -> FileMeta {
        FileMeta {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            file_size: self.bytes.len() as u64,
        }
    }
}

/// 分类器可见的文件元信息。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileMeta {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub file_size: u64,
}

/// 解码后的源图：只读 RGBA8 位图。
///
/// 整次任务只创建一次，通过 `Arc` 在并发档位任务间共享。
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    meta: FileMeta,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage, meta: FileMeta) -> Self {
        Self { pixels, meta }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn mime_type(&self) -> &str {
        &self.meta.mime_type
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }
}
