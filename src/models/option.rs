use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 选项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionCategory {
    /// 政党选项
    PartyOption,
    /// 议会选区（大选）候选人
    MpCandidate,
    /// 邦议会候选人
    MlaCandidate,
    /// 国大党候选人
    CongressCandidate,
    /// 种姓 / 社会类别
    CasteOption,
}

impl OptionCategory {
    pub const ALL: [OptionCategory; 5] = [
        OptionCategory::PartyOption,
        OptionCategory::MpCandidate,
        OptionCategory::MlaCandidate,
        OptionCategory::CongressCandidate,
        OptionCategory::CasteOption,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionCategory::PartyOption => "party_options",
            OptionCategory::MpCandidate => "mp_candidates",
            OptionCategory::MlaCandidate => "mla_candidates",
            OptionCategory::CongressCandidate => "congress_candidates",
            OptionCategory::CasteOption => "caste_options",
        }
    }
}

impl std::fmt::Display for OptionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 去重后的选项列表
///
/// 去重按首次出现的顺序保留，并且跨越提取值与兜底值的边界。
/// 兜底表在加载设置时已校验非空，因此列表总有选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionList(Vec<String>);

impl OptionList {
    /// 由提取值和兜底值构造
    pub fn new(extracted: Vec<String>, fallback: &[String]) -> Self {
        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(extracted.len() + fallback.len());
        for value in extracted.into_iter().chain(fallback.iter().cloned()) {
            if seen.insert(value.clone()) {
                values.push(value);
            }
        }
        Self(values)
    }

    /// 只包含兜底值的列表
    pub fn fallback_only(fallback: &[String]) -> Self {
        Self::new(Vec::new(), fallback)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 是否所有选项都来自兜底值
    pub fn is_fallback_only(&self, fallback: &[String]) -> bool {
        self.0.iter().all(|v| fallback.contains(v))
    }
}

/// 单个选区的所有类别选项
pub type CategoryOptions = BTreeMap<OptionCategory, OptionList>;

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let list = OptionList::new(strings(&["BJP", "INC", "BJP", "AGP"]), &strings(&["NOTA"]));
        assert_eq!(list.as_slice(), &strings(&["BJP", "INC", "AGP", "NOTA"])[..]);
    }

    #[test]
    fn test_dedup_across_fallback_boundary() {
        let list = OptionList::new(strings(&["NOTA", "Candidate A"]), &strings(&["NOTA", "Not Sure"]));
        assert_eq!(list.as_slice(), &strings(&["NOTA", "Candidate A", "Not Sure"])[..]);
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let list = OptionList::new(strings(&["Bjp", "BJP"]), &[]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_fallback_only_uses_configured_tokens() {
        let table = crate::config::FallbackTable::default();
        for category in OptionCategory::ALL {
            let list = OptionList::fallback_only(table.tokens(category));
            assert!(!list.is_empty(), "{}", category);
            assert_eq!(list.as_slice(), table.tokens(category));
        }
        assert!(OptionList::new(Vec::new(), &[]).is_empty());

        let list = OptionList::fallback_only(&strings(&["Other Caste", "Do not want to Answer"]));
        assert_eq!(list.len(), 2);
        assert!(list.is_fallback_only(&strings(&["Other Caste", "Do not want to Answer"])));
    }
}
