//! 分区提交上下文
//!
//! 封装"我正在往哪个表单提交第几个分区"这一信息

use crate::models::SectionName;
use std::fmt::Display;

/// 分区提交上下文
#[derive(Debug, Clone)]
pub struct SectionCtx {
    /// 表单ID
    pub form_id: String,

    /// 分区名
    pub section: SectionName,

    /// 分区序号（从1开始，仅用于日志显示）
    pub ordinal: usize,

    /// 分区总数
    pub total_sections: usize,
}

impl SectionCtx {
    /// 创建新的分区上下文
    pub fn new(form_id: impl Into<String>, section: SectionName, ordinal: usize, total_sections: usize) -> Self {
        Self {
            form_id: form_id.into(),
            section,
            ordinal,
            total_sections,
        }
    }
}

impl Display for SectionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[表单 {} 分区 {}/{} {}]",
            self.form_id, self.ordinal, self.total_sections, self.section
        )
    }
}
