//! 双语题目文本（questions.json）

use crate::models::option::OptionCategory;
use serde::{Deserialize, Serialize};

/// 介绍语中的调查员名字占位符
pub const CALLER_NAME_PLACEHOLDER: &str = "[caller_name]";

/// 一段双语文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    #[serde(alias = "english")]
    pub primary: String,
    #[serde(alias = "bengali")]
    pub secondary: String,
}

impl BilingualText {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// 用分隔符拼接两种语言
    pub fn join(&self, separator: &str) -> String {
        format!("{}{}{}", self.primary, separator, self.secondary)
    }
}

/// 带固定选项的双语题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptWithOptions {
    #[serde(flatten)]
    pub text: BilingualText,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicInfoPrompts {
    pub agent_id: BilingualText,
    pub mobile_number: BilingualText,
    pub gender: PromptWithOptions,
    #[serde(alias = "ac_selection")]
    pub constituency_selection: BilingualText,
}

/// 选区分区的六道题，顺序固定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencyPrompts {
    #[serde(alias = "q1")]
    pub voting_intention: BilingualText,
    #[serde(alias = "q2")]
    pub previous_vote: BilingualText,
    #[serde(alias = "q3")]
    pub mp_vote: BilingualText,
    #[serde(alias = "q4")]
    pub mla_preference: BilingualText,
    #[serde(alias = "q5")]
    pub congress_preference: BilingualText,
    #[serde(alias = "q6")]
    pub social_category: BilingualText,
}

impl ConstituencyPrompts {
    /// 题目与选项类别的绑定
    ///
    /// 前两题共用同一份政党选项
    pub fn bound(&self) -> [(&BilingualText, OptionCategory); 6] {
        [
            (&self.voting_intention, OptionCategory::PartyOption),
            (&self.previous_vote, OptionCategory::PartyOption),
            (&self.mp_vote, OptionCategory::MpCandidate),
            (&self.mla_preference, OptionCategory::MlaCandidate),
            (&self.congress_preference, OptionCategory::CongressCandidate),
            (&self.social_category, OptionCategory::CasteOption),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPrompts {
    #[serde(alias = "q7")]
    pub family_income: PromptWithOptions,
    #[serde(alias = "q8")]
    pub interview_language: PromptWithOptions,
}

/// 固定分区的标题文字
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Headings {
    pub introduction_title: String,
    pub final_title: String,
    pub final_description: String,
}

impl Default for Headings {
    fn default() -> Self {
        Self {
            introduction_title: "Introduction / পরিচয়".to_string(),
            final_title: "Final Questions / চূড়ান্ত প্রশ্ন".to_string(),
            final_description:
                "Please answer these final questions / অনুগ্রহ করে এই চূড়ান্ত প্রশ্নগুলির উত্তর দিন"
                    .to_string(),
        }
    }
}

/// 完整的题目文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionCatalog {
    pub introduction: BilingualText,
    pub basic_info: BasicInfoPrompts,
    #[serde(alias = "ac_questions")]
    pub constituency_questions: ConstituencyPrompts,
    pub final_questions: FinalPrompts,
    #[serde(default)]
    pub headings: Headings,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_original_field_names() {
        let catalog = fixtures::catalog();
        assert_eq!(catalog.basic_info.gender.options.len(), 3);
        assert_eq!(catalog.basic_info.gender.text.primary, "Gender");
        assert_eq!(catalog.final_questions.interview_language.options[2], "Hindi");
        assert_eq!(catalog.headings.introduction_title, "Introduction / পরিচয়");
    }

    #[test]
    fn test_bound_order() {
        let catalog = fixtures::catalog();
        let categories: Vec<OptionCategory> = catalog
            .constituency_questions
            .bound()
            .iter()
            .map(|(_, c)| *c)
            .collect();
        assert_eq!(
            categories,
            vec![
                OptionCategory::PartyOption,
                OptionCategory::PartyOption,
                OptionCategory::MpCandidate,
                OptionCategory::MlaCandidate,
                OptionCategory::CongressCandidate,
                OptionCategory::CasteOption,
            ]
        );
    }

    #[test]
    fn test_join() {
        let text = BilingualText::new("Gender", "লিঙ্গ");
        assert_eq!(text.join(" | "), "Gender | লিঙ্গ");
    }
}
