//! # 自适应重编码模块（reencoder）
//!
//! ## 设计思路
//!
//! 将“来源识别 → 加载校验 → 解码 → 特征提取 → 分类 → 缩放 → 预算 → 编码”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：承载可注入状态（`ReencodeService`）与请求级取消
//! - `handler`：编排整条处理流水线
//! - `loader`：负责文件 / Base64 / 内存字节加载与格式嗅探
//! - `pipeline`：负责解码与像素 / 内存限制
//! - `features`：9×9 网格采样与特征向量
//! - `classifier`：四层分类（即时 → 绝对 → 交叉验证 → 评分）
//! - `budget`：按子类型与特征规划目标体积
//! - `resize` / `transform`：缩放与缩放后增强
//! - `encoder` / `codec`：质量二分与可替换编码器
//! - `config/error/source/profile/progress`：配置、错误、中间数据模型、档位与进度
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 调用方（CLI / 上层应用）
//!    ↓
//! service.rs（请求 ID、取消标志）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志 + 进度事件）
//!    ├─ loader.rs（来源加载 + 嗅探）
//!    ├─ pipeline.rs（解码 + 像素限制）
//!    ├─ features.rs → classifier/（一次）
//!    └─ 每个档位并发：resize.rs → transform.rs → budget.rs → encoder.rs
//!    ↓
//! RunReport（按宽度降序）
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 分类阈值优先改 `classifier/rules.rs` 与 `classifier/scoring.rs`
//! - 体积偏大 / 偏小优先看 `budget.rs` 的子类型权重
//! - 业务流程顺序变更优先改 `handler.rs`

pub mod budget;
pub mod classifier;
pub mod codec;
mod config;
pub mod encoder;
mod error;
pub mod features;
mod handler;
mod loader;
mod pipeline;
pub mod profile;
pub mod progress;
pub mod resize;
mod service;
mod source;
pub mod transform;

pub use classifier::{Category, Classification, Subtype, Tier, classify};
pub use codec::{Codec, CodecKind, JpegCodec, WebpCodec};
pub use config::{PerformanceProfile, ReencodeConfig};
pub use error::ReencodeError;
pub use features::{FeatureVector, analyze};
pub use handler::{CompressionResult, ProfileFailure, Reencoder, RunReport};
pub use loader::SVG_MIME_TYPE;
pub use profile::{OutputProfile, default_profiles};
pub use progress::{CancellationFlag, ProgressEvent, ProgressStatus};
pub use service::ReencodeService;
pub use source::{FileMeta, ImageSource, SourceImage};
