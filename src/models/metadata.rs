use crate::models::constituency::ConstituencyKey;
use crate::models::document::SectionName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分区 → 已创建条目 ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMapping {
    pub introduction: Vec<String>,
    pub basic_info: Vec<String>,
    pub constituency_sections: BTreeMap<ConstituencyKey, Vec<String>>,
    pub final_section: Vec<String>,
}

impl SectionMapping {
    /// 为给定分区建立空骨架
    pub fn skeleton<'a>(sections: impl IntoIterator<Item = &'a SectionName>) -> Self {
        let mut mapping = Self::default();
        for name in sections {
            if let SectionName::Constituency(key) = name {
                mapping.constituency_sections.insert(*key, Vec::new());
            }
        }
        mapping
    }

    /// 记录某个分区的条目 ID
    pub fn record(&mut self, section: &SectionName, ids: Vec<String>) {
        match section {
            SectionName::Introduction => self.introduction = ids,
            SectionName::BasicInfo => self.basic_info = ids,
            SectionName::Constituency(key) => {
                self.constituency_sections.insert(*key, ids);
            }
            SectionName::Final => self.final_section = ids,
        }
    }

    pub fn ids_for(&self, section: &SectionName) -> Option<&[String]> {
        match section {
            SectionName::Introduction => Some(&self.introduction),
            SectionName::BasicInfo => Some(&self.basic_info),
            SectionName::Constituency(key) => {
                self.constituency_sections.get(key).map(|v| v.as_slice())
            }
            SectionName::Final => Some(&self.final_section),
        }
    }

    pub fn total_items(&self) -> usize {
        self.introduction.len()
            + self.basic_info.len()
            + self.constituency_sections.values().map(Vec::len).sum::<usize>()
            + self.final_section.len()
    }
}

/// 生成结果的元数据记录
///
/// 仅供参考，远程文档本身才是权威状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormMetadata {
    pub form_id: String,
    pub title: String,
    pub edit_url: String,
    pub public_url: String,
    pub total_constituencies: usize,
    pub constituency_keys: Vec<ConstituencyKey>,
    pub section_mapping: SectionMapping,
    pub creation_timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let k = ConstituencyKey::new(5).unwrap();
        let names = [SectionName::Introduction, SectionName::Constituency(k)];
        let mut mapping = SectionMapping::skeleton(names.iter());
        assert_eq!(mapping.ids_for(&SectionName::Constituency(k)), Some(&[][..]));

        mapping.record(&SectionName::Introduction, vec!["a".to_string()]);
        mapping.record(&SectionName::Constituency(k), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(mapping.total_items(), 3);
    }

    #[test]
    fn test_keys_serialize_as_json_object() {
        let mut mapping = SectionMapping::default();
        mapping.record(
            &SectionName::Constituency(ConstituencyKey::new(111).unwrap()),
            vec!["x".to_string()],
        );
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["constituency_sections"]["111"][0], "x");
    }
}
