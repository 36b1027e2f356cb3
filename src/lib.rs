//! # 自适应图片重编码 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        调用方：reencode CLI / 上层应用                    │
//! │   settings (JSON) ── AppError (统一错误 + Serialize)      │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ ReencodeService::process / cancel
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            reencoder                             │
//! │                                                          │
//! │  loader → pipeline ──► SourceImage (只读, Arc 共享)       │
//! │                 │                                        │
//! │                 ├─ features   9×9 网格特征向量            │
//! │                 └─ classifier 即时/绝对/交叉验证/评分      │
//! │                                                          │
//! │  每个档位并发 (JoinSet + spawn_blocking + Semaphore)：    │
//! │     resize → transform → budget → encoder(codec)         │
//! │                                                          │
//! │  progress：单调进度事件 + 协作式取消                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用层统一错误类型 `AppError` |
//! | [`reencoder`] | 加载、解码、分析、分类、缩放、预算与自适应编码 |
//! | [`settings`] | JSON 设置文件与档位文件 |

pub mod error;
pub mod reencoder;
pub mod settings;
