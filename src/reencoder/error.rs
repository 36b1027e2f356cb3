//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载重编码链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! ## 错误分级
//!
//! - 运行级（整次任务中止）：`Decode` / `UnsupportedFormat` / `ResourceLimit` / `FileSystem`
//! - 档位级（仅跳过当前档位，兄弟档位继续）：`InvalidProfile` / `InvalidDimension` / `Encode`
//! - 提示级（不是失败）：`EncodeBudgetUnreachable`，编码器仍返回尽力结果
//! - `Cancelled`：协作式取消，不作为失败上报

/// 重编码统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReencodeError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("不支持的格式：{0}")]
    UnsupportedFormat(String),

    #[error("档位 `{profile}` 配置无效：{reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("尺寸参数无效：{0}")]
    InvalidDimension(String),

    #[error("档位 `{profile}` 无法满足体积预算：目标 {target} 字节，最低质量输出 {achieved} 字节")]
    EncodeBudgetUnreachable {
        profile: String,
        target: u64,
        achieved: u64,
    },

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("配置错误：{0}")]
    Config(String),

    #[error("任务已取消：{0}")]
    Cancelled(String),
}

impl ReencodeError {
    /// 稳定错误码，供调用方做分支处理与日志聚合。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "E_DECODE",
            Self::UnsupportedFormat(_) => "E_UNSUPPORTED_FORMAT",
            Self::InvalidProfile { .. } => "E_INVALID_PROFILE",
            Self::InvalidDimension(_) => "E_INVALID_DIMENSION",
            Self::EncodeBudgetUnreachable { .. } => "E_BUDGET_UNREACHABLE",
            Self::Encode(_) => "E_ENCODE",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::Config(_) => "E_CONFIG",
            Self::Cancelled(_) => "E_CANCELLED",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FileSystem(_) | Self::ResourceLimit(_) => "load",
            Self::Decode(_) | Self::UnsupportedFormat(_) => "decode",
            Self::InvalidProfile { .. } | Self::Config(_) => "plan",
            Self::InvalidDimension(_) => "resize",
            Self::EncodeBudgetUnreachable { .. } | Self::Encode(_) => "encode",
            Self::Cancelled(_) => "cancel",
        }
    }

    /// 是否只影响单个档位（兄弟档位应继续处理）。
    pub fn is_profile_scoped(&self) -> bool {
        matches!(
            self,
            Self::InvalidProfile { .. }
                | Self::InvalidDimension(_)
                | Self::Encode(_)
                | Self::EncodeBudgetUnreachable { .. }
        )
    }
}
