//! # 设置文件
//!
//! JSON 格式，所有字段可选：
//!
//! ```json
//! {
//!   "performance": "balanced",
//!   "codec": "webp",
//!   "max_concurrency": 4,
//!   "profiles": [{ "name": "m", "max_dimension": 864, "min_kb": 4, "max_kb": 40 }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::reencoder::{CodecKind, OutputProfile, PerformanceProfile, ReencodeConfig, default_profiles};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub performance: Option<String>,
    pub codec: Option<CodecKind>,
    pub max_concurrency: Option<usize>,
    pub profiles: Vec<OutputProfile>,
}

impl AppSettings {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败 {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 覆盖到配置上；未出现的字段保持原值。
    pub fn apply(&self, config: &mut ReencodeConfig) -> Result<(), AppError> {
        if let Some(performance) = &self.performance {
            config.apply_performance_profile(PerformanceProfile::from_str(performance)?);
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        Ok(())
    }

    /// 设置中的档位；为空时使用默认档位。
    pub fn profiles_or_default(&self) -> Vec<OutputProfile> {
        if self.profiles.is_empty() {
            default_profiles()
        } else {
            self.profiles.clone()
        }
    }
}

/// 读取单独的档位文件（JSON 数组）。
pub fn load_profiles(path: &Path) -> Result<Vec<OutputProfile>, AppError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Settings(format!("解析档位文件失败 {}: {}", path.display(), e)))
}
