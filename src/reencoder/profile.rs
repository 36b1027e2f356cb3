//! # 输出档位模块
//!
//! 档位之间相互独立、与顺序无关。非法档位在规划阶段被单独剔除并上报，
//! 不影响同一任务内的其它档位。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::ReencodeError;
use super::classifier::Category;

/// 一个命名输出档位：最长边上限 + 体积区间 + 类别名义预算表（KB）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProfile {
    pub name: String,
    pub max_dimension: u32,
    pub min_kb: u32,
    pub max_kb: u32,
    /// 类别 → 名义预算（KB，钳制前）。缺省时按 `min_kb` 与子类型倍率估算。
    #[serde(default)]
    pub budgets: BTreeMap<Category, f64>,
}

impl OutputProfile {
    pub fn new(name: impl Into<String>, max_dimension: u32, min_kb: u32, max_kb: u32) -> Self {
        Self {
            name: name.into(),
            max_dimension,
            min_kb,
            max_kb,
            budgets: BTreeMap::new(),
        }
    }

    pub fn with_budget(mut self, category: Category, kb: f64) -> Self {
        self.budgets.insert(category, kb);
        self
    }

    pub fn min_bytes(&self) -> u64 {
        self.min_kb as u64 * 1024
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_kb as u64 * 1024
    }

    fn invalid(&self, reason: impl Into<String>) -> ReencodeError {
        ReencodeError::InvalidProfile {
            profile: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// 校验单个档位。
    pub fn validate(&self) -> Result<(), ReencodeError> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("档位名称不能为空"));
        }
        if self.max_dimension == 0 {
            return Err(self.invalid("max_dimension 必须大于 0"));
        }
        if self.min_kb == 0 {
            return Err(self.invalid("min_kb 必须大于 0"));
        }
        if self.min_kb > self.max_kb {
            return Err(self.invalid(format!(
                "体积区间无效：{}~{} KB",
                self.min_kb, self.max_kb
            )));
        }
        if let Some((category, kb)) = self
            .budgets
            .iter()
            .find(|(_, kb)| !kb.is_finite() || **kb <= 0.0)
        {
            return Err(self.invalid(format!(
                "预算表项 {} 无效：{}",
                category.as_str(),
                kb
            )));
        }
        Ok(())
    }
}

/// 默认档位：`m`（864px，4~40KB）与 `s`（420px，2~18KB）。
pub fn default_profiles() -> Vec<OutputProfile> {
    vec![
        OutputProfile::new("m", 864, 4, 40),
        OutputProfile::new("s", 420, 2, 18),
    ]
}

/// 将档位拆分为可处理与非法两组；重名档位只保留第一个。
pub fn partition_profiles(
    profiles: Vec<OutputProfile>,
) -> (Vec<OutputProfile>, Vec<(String, ReencodeError)>) {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(profiles.len());
    let mut rejected = Vec::new();

    for profile in profiles {
        if let Err(err) = profile.validate() {
            rejected.push((profile.name.clone(), err));
            continue;
        }
        if !seen.insert(profile.name.clone()) {
            let err = profile.invalid("档位名称重复");
            rejected.push((profile.name.clone(), err));
            continue;
        }
        valid.push(profile);
    }

    (valid, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profiles_are_valid() {
        for profile in default_profiles() {
            profile.validate().expect("default profile should be valid");
        }
    }

    #[test]
    fn rejects_zero_dimension_and_inverted_range() {
        let err = OutputProfile::new("x", 0, 1, 2).validate().expect_err("zero dim");
        assert!(matches!(err, ReencodeError::InvalidProfile { ref profile, .. } if profile == "x"));

        assert!(OutputProfile::new("y", 100, 10, 5).validate().is_err());
        assert!(OutputProfile::new("z", 100, 0, 5).validate().is_err());
        assert!(OutputProfile::new(" ", 100, 1, 5).validate().is_err());
    }

    #[test]
    fn rejects_malformed_budget_table() {
        let profile = OutputProfile::new("m", 864, 4, 40).with_budget(Category::Photo, -3.0);
        assert!(profile.validate().is_err());
        let profile = OutputProfile::new("m", 864, 4, 40).with_budget(Category::Photo, f64::NAN);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn partition_keeps_siblings_of_invalid_profile() {
        let (valid, rejected) = partition_profiles(vec![
            OutputProfile::new("l", 1080, 8, 80),
            OutputProfile::new("bad", 0, 1, 2),
            OutputProfile::new("s", 480, 2, 18),
            OutputProfile::new("l", 200, 1, 2),
        ]);
        let names: Vec<&str> = valid.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["l", "s"]);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].0, "bad");
    }

    #[test]
    fn profile_json_uses_category_names() {
        let json = r#"{"name":"t","max_dimension":240,"min_kb":1,"max_kb":8,"budgets":{"PHOTO":5.5}}"#;
        let profile: OutputProfile = serde_json::from_str(json).expect("parse profile");
        assert_eq!(profile.budgets.get(&Category::Photo), Some(&5.5));

        let minimal: OutputProfile =
            serde_json::from_str(r#"{"name":"s","max_dimension":420,"min_kb":2,"max_kb":18}"#)
                .expect("budgets default");
        assert!(minimal.budgets.is_empty());
    }
}
