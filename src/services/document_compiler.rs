//! 文档编译服务 - 业务能力层
//!
//! 把题目文本和提取结果编译为带位置索引的条目序列。
//! 整个文档只有一个位置游标，每个条目占用一个位置，不跳号也不重复。

use crate::config::Settings;
use crate::models::catalog::CALLER_NAME_PLACEHOLDER;
use crate::models::document::ChoiceKind;
use crate::models::{
    BilingualText, CategoryOptions, CompiledDocument, CompiledSection, ConstituencyKey, DocumentItem,
    OptionList, PositionedItem, QuestionCatalog, SectionMapping, SectionName,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 基础信息题目的语言分隔符
const BASIC_INFO_SEPARATOR: &str = " / ";
/// 选区题目和结尾题目的语言分隔符
const QUESTION_SEPARATOR: &str = " | ";

/// 各分区的固定条目数
pub const INTRODUCTION_ITEMS: usize = 1;
pub const BASIC_INFO_ITEMS: usize = 4;
pub const CONSTITUENCY_ITEMS: usize = 8;
pub const FINAL_ITEMS: usize = 4;

/// N 个选区时文档的总条目数
pub fn expected_total_items(constituencies: usize) -> usize {
    INTRODUCTION_ITEMS + BASIC_INFO_ITEMS + CONSTITUENCY_ITEMS * constituencies + FINAL_ITEMS
}

/// 文档编译服务
pub struct DocumentCompiler<'a> {
    catalog: &'a QuestionCatalog,
    settings: &'a Settings,
    caller_name: String,
    cursor: usize,
}

impl<'a> DocumentCompiler<'a> {
    pub fn new(catalog: &'a QuestionCatalog, settings: &'a Settings, caller_name: impl Into<String>) -> Self {
        Self {
            catalog,
            settings,
            caller_name: caller_name.into(),
            cursor: 0,
        }
    }

    /// 下一个条目的位置
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn key_label(&self, key: ConstituencyKey) -> String {
        key.label(&self.settings.form.key_label_prefix)
    }

    /// 在当前游标处放置条目并前移游标
    fn place(&mut self, items: Vec<DocumentItem>) -> Vec<PositionedItem> {
        items
            .into_iter()
            .map(|item| {
                let positioned = PositionedItem {
                    index: self.cursor,
                    item,
                };
                self.cursor += 1;
                positioned
            })
            .collect()
    }

    /// 介绍语：一个文本块，两种语言都替换调查员名字
    pub fn compile_introduction(&mut self) -> CompiledSection {
        let intro = &self.catalog.introduction;
        let description = format!(
            "{}\n\n{}",
            intro.primary.replace(CALLER_NAME_PLACEHOLDER, &self.caller_name),
            intro.secondary.replace(CALLER_NAME_PLACEHOLDER, &self.caller_name)
        );
        let item = DocumentItem::TextBlock {
            title: self.catalog.headings.introduction_title.clone(),
            description,
        };
        CompiledSection {
            name: SectionName::Introduction,
            items: self.place(vec![item]),
        }
    }

    /// 基础信息：工号、手机号、性别、选区选择
    ///
    /// 选区下拉框按编号升序列出所有有效选区
    pub fn compile_basic_info<'k>(&mut self, keys: impl IntoIterator<Item = &'k ConstituencyKey>) -> CompiledSection {
        let mut keys: Vec<ConstituencyKey> = keys.into_iter().copied().collect();
        keys.sort();
        keys.dedup();
        let labels: Vec<String> = keys.iter().map(|k| self.key_label(*k)).collect();

        let basic = &self.catalog.basic_info;
        let items = vec![
            DocumentItem::short_text(basic.agent_id.join(BASIC_INFO_SEPARATOR)),
            DocumentItem::short_text(basic.mobile_number.join(BASIC_INFO_SEPARATOR)),
            DocumentItem::single_choice(
                basic.gender.text.join(BASIC_INFO_SEPARATOR),
                ChoiceKind::Radio,
                basic.gender.options.clone(),
            ),
            DocumentItem::single_choice(
                basic.constituency_selection.join(BASIC_INFO_SEPARATOR),
                ChoiceKind::DropDown,
                labels,
            ),
        ];
        CompiledSection {
            name: SectionName::BasicInfo,
            items: self.place(items),
        }
    }

    /// 单个选区的分区：分页、标题块、六道单选题
    ///
    /// # 参数
    /// - `key`: 选区编号
    /// - `options`: 该选区各类别的选项，缺失的类别按兜底选项处理
    pub fn compile_constituency_section(&mut self, key: ConstituencyKey, options: &CategoryOptions) -> CompiledSection {
        let label = self.key_label(key);
        let mut items = vec![
            DocumentItem::PageBreak,
            DocumentItem::TextBlock {
                title: format!("Questions for {}", label),
                description: format!("Please answer the following questions specific to {}", label),
            },
        ];

        for (prompt, category) in self.catalog.constituency_questions.bound() {
            let list = options
                .get(&category)
                .cloned()
                .unwrap_or_else(|| OptionList::fallback_only(self.settings.fallbacks.tokens(category)));
            items.push(DocumentItem::single_choice(
                prompt.join(QUESTION_SEPARATOR),
                ChoiceKind::Radio,
                list.as_slice().to_vec(),
            ));
        }

        debug!("[选区 {}] 编译完成，起始位置 {}", key, self.cursor);
        CompiledSection {
            name: SectionName::Constituency(key),
            items: self.place(items),
        }
    }

    /// 结尾分区：分页、标题块、收入和访谈语言两道固定题
    pub fn compile_final_section(&mut self) -> CompiledSection {
        let headings = &self.catalog.headings;
        let finals = &self.catalog.final_questions;
        let fixed = |text: &BilingualText, options: &[String]| {
            DocumentItem::single_choice(text.join(QUESTION_SEPARATOR), ChoiceKind::Radio, options.to_vec())
        };
        let items = vec![
            DocumentItem::PageBreak,
            DocumentItem::TextBlock {
                title: headings.final_title.clone(),
                description: headings.final_description.clone(),
            },
            fixed(&finals.family_income.text, &finals.family_income.options),
            fixed(&finals.interview_language.text, &finals.interview_language.options),
        ];
        CompiledSection {
            name: SectionName::Final,
            items: self.place(items),
        }
    }

    /// 编译整份文档
    ///
    /// 固定顺序：介绍、基础信息、按编号升序的选区分区、结尾。游标从 0 开始
    pub fn compile_document(&mut self, all_keys: &BTreeMap<ConstituencyKey, CategoryOptions>) -> CompiledDocument {
        self.cursor = 0;

        let mut sections = Vec::with_capacity(all_keys.len() + 3);
        sections.push(self.compile_introduction());
        sections.push(self.compile_basic_info(all_keys.keys()));
        for (key, options) in all_keys {
            sections.push(self.compile_constituency_section(*key, options));
        }
        sections.push(self.compile_final_section());

        let mapping = SectionMapping::skeleton(sections.iter().map(|s| &s.name));
        let document = CompiledDocument { sections, mapping };

        info!(
            "✓ 文档编译完成: {} 个选区, {} 个条目",
            all_keys.len(),
            document.total_items()
        );
        document
    }
}
