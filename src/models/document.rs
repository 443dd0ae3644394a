//! 文档条目模型
//!
//! 编译器产出的条目都带有位置索引，整个文档共享一条从 0 开始的连续序列

use crate::models::constituency::ConstituencyKey;
use crate::models::metadata::SectionMapping;
use serde_json::{json, Value as JsonValue};

/// 选择题展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    Radio,
    DropDown,
}

impl ChoiceKind {
    fn as_api_str(self) -> &'static str {
        match self {
            ChoiceKind::Radio => "RADIO",
            ChoiceKind::DropDown => "DROP_DOWN",
        }
    }
}

/// 题目类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// 开放文本
    Text { paragraph: bool },
    /// 单选
    Choice {
        kind: ChoiceKind,
        options: Vec<String>,
        shuffle: bool,
    },
}

/// 文档条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentItem {
    TextBlock { title: String, description: String },
    PageBreak,
    Question {
        title: String,
        required: bool,
        kind: QuestionKind,
    },
}

impl DocumentItem {
    /// 必答、不打乱顺序的单选题
    pub fn single_choice(title: String, kind: ChoiceKind, options: Vec<String>) -> Self {
        DocumentItem::Question {
            title,
            required: true,
            kind: QuestionKind::Choice {
                kind,
                options,
                shuffle: false,
            },
        }
    }

    /// 必答的单行文本题
    pub fn short_text(title: String) -> Self {
        DocumentItem::Question {
            title,
            required: true,
            kind: QuestionKind::Text { paragraph: false },
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            DocumentItem::TextBlock { title, .. } | DocumentItem::Question { title, .. } => {
                Some(title)
            }
            DocumentItem::PageBreak => None,
        }
    }

    /// 转换为表单 API 的 item 结构
    fn to_api_item(&self) -> JsonValue {
        match self {
            DocumentItem::TextBlock { title, description } => json!({
                "title": title,
                "description": description,
                "textItem": {}
            }),
            DocumentItem::PageBreak => json!({ "pageBreakItem": {} }),
            DocumentItem::Question {
                title,
                required,
                kind,
            } => {
                let question = match kind {
                    QuestionKind::Text { paragraph } => json!({
                        "required": required,
                        "textQuestion": { "paragraph": paragraph }
                    }),
                    QuestionKind::Choice {
                        kind,
                        options,
                        shuffle,
                    } => {
                        let options: Vec<JsonValue> =
                            options.iter().map(|o| json!({ "value": o })).collect();
                        json!({
                            "required": required,
                            "choiceQuestion": {
                                "type": kind.as_api_str(),
                                "options": options,
                                "shuffle": shuffle
                            }
                        })
                    }
                };
                json!({
                    "title": title,
                    "questionItem": { "question": question }
                })
            }
        }
    }
}

/// 带位置索引的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedItem {
    pub index: usize,
    pub item: DocumentItem,
}

impl PositionedItem {
    /// 生成 createItem 请求
    pub fn to_request(&self) -> JsonValue {
        json!({
            "createItem": {
                "item": self.item.to_api_item(),
                "location": { "index": self.index }
            }
        })
    }
}

/// 分区名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
    Introduction,
    BasicInfo,
    Constituency(ConstituencyKey),
    Final,
}

impl SectionName {
    /// 批次标签，同时用作合成 ID 的前缀
    pub fn label(&self) -> String {
        match self {
            SectionName::Introduction => "introduction".to_string(),
            SectionName::BasicInfo => "basic_info".to_string(),
            SectionName::Constituency(key) => format!("constituency_{}", key),
            SectionName::Final => "final_section".to_string(),
        }
    }
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// 一个分区的条目，作为一个批次整体提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSection {
    pub name: SectionName,
    pub items: Vec<PositionedItem>,
}

impl CompiledSection {
    pub fn start_index(&self) -> usize {
        self.items.first().map(|i| i.index).unwrap_or(0)
    }

    /// 分区之后的第一个位置
    pub fn end_index(&self) -> usize {
        self.items.last().map(|i| i.index + 1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// batchUpdate 请求体
    pub fn to_batch_request(&self) -> JsonValue {
        let requests: Vec<JsonValue> = self.items.iter().map(PositionedItem::to_request).collect();
        json!({ "requests": requests })
    }
}

/// 编译完成的整份文档
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub sections: Vec<CompiledSection>,
    /// 分区骨架，条目 ID 由提交阶段填入
    pub mapping: SectionMapping,
}

impl CompiledDocument {
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(CompiledSection::len).sum()
    }

    /// 按提交顺序展开的全部条目
    pub fn operations(&self) -> impl Iterator<Item = &PositionedItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    /// 选区分区的顺序
    pub fn constituency_order(&self) -> Vec<ConstituencyKey> {
        self.sections
            .iter()
            .filter_map(|s| match s.name {
                SectionName::Constituency(key) => Some(key),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_request_shape() {
        let item = PositionedItem {
            index: 3,
            item: DocumentItem::single_choice(
                "Gender / লিঙ্গ".to_string(),
                ChoiceKind::Radio,
                vec!["Male".to_string(), "Female".to_string()],
            ),
        };
        let req = item.to_request();
        assert_eq!(req["createItem"]["location"]["index"], 3);
        let question = &req["createItem"]["item"]["questionItem"]["question"];
        assert_eq!(question["required"], true);
        assert_eq!(question["choiceQuestion"]["type"], "RADIO");
        assert_eq!(question["choiceQuestion"]["shuffle"], false);
        assert_eq!(question["choiceQuestion"]["options"][1]["value"], "Female");
    }

    #[test]
    fn test_page_break_has_no_title() {
        let item = DocumentItem::PageBreak;
        assert!(item.title().is_none());
        let req = PositionedItem { index: 0, item }.to_request();
        assert!(req["createItem"]["item"]["pageBreakItem"].is_object());
    }

    #[test]
    fn test_section_labels() {
        let key = ConstituencyKey::new(111).unwrap();
        assert_eq!(SectionName::Constituency(key).label(), "constituency_111");
        assert_eq!(SectionName::Final.label(), "final_section");
    }
}
