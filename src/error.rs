//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用层统一的 `AppError` 枚举，替代 CLI / 设置加载中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ReencodeError`、`std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于 `--json` 输出。

use serde::Serialize;

use crate::reencoder::ReencodeError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 重编码流水线错误（加载 / 解码 / 编码 / 取消）
    #[error("{0}")]
    Reencode(#[from] ReencodeError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件 / 档位文件无效
    #[error("设置无效: {0}")]
    Settings(String),

    /// 批量处理中有输入失败
    #[error("{failed}/{total} 个输入处理失败")]
    Batch { failed: usize, total: usize },
}

impl AppError {
    /// 进程退出码：取消为 130，其它失败为 1。
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Reencode(ReencodeError::Cancelled(_)) => 130,
            _ => 1,
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
