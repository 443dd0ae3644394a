//! 选项提取服务 - 业务能力层
//!
//! 从数据表中为单个选区提取各类别的选项，任何失败都退回到兜底选项

use crate::config::{ColumnMap, Settings, TableKind};
use crate::error::SourceError;
use crate::infrastructure::{Cell, SourceSet, TabularSource};
use crate::models::{CategoryOptions, ConstituencyKey, OptionCategory, OptionList};
use crate::services::key_resolver::validate_cell;
use tracing::{debug, info, warn};

/// 清洗后视为缺失的占位文本（不区分大小写）
const ABSENT_MARKERS: [&str; 3] = ["nan", "none", "null"];

/// 清洗单元格
///
/// 去掉首尾空白；空值和 nan / none / null 视为缺失
pub fn clean_option(cell: &Cell) -> Option<String> {
    let raw = cell.as_raw()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if ABSENT_MARKERS.contains(&lower.as_str()) {
        return None;
    }
    Some(trimmed.to_string())
}

/// 选项提取服务
pub struct OptionExtractor<'a> {
    sources: &'a SourceSet,
    settings: &'a Settings,
}

impl<'a> OptionExtractor<'a> {
    pub fn new(sources: &'a SourceSet, settings: &'a Settings) -> Self {
        Self { sources, settings }
    }

    fn fallback(&self, category: OptionCategory) -> &[String] {
        self.settings.fallbacks.tokens(category)
    }

    /// 提取单个类别的选项
    ///
    /// # 返回
    /// 数据表不可用时只返回兜底选项；列缺失等结构问题作为错误返回
    pub fn extract(&self, key: ConstituencyKey, category: OptionCategory) -> Result<OptionList, SourceError> {
        let table = source_table(category);
        let source = match self.sources.get(table) {
            Ok(source) => source,
            Err(e) => {
                warn!("[选区 {}] ⚠️ {} 使用兜底选项: {}", key, category, e);
                return Ok(OptionList::fallback_only(self.fallback(category)));
            }
        };
        let columns = self.settings.excel.columns.for_table(table);

        let extracted = match category {
            OptionCategory::PartyOption => self.party_options(source, columns, key)?,
            OptionCategory::MpCandidate | OptionCategory::MlaCandidate => {
                let name_col = required(source, columns.candidate_name.as_deref(), "candidate_name")?;
                single_column(source, columns, key, name_col, |_| true)?
            }
            OptionCategory::CongressCandidate => {
                let name_col = required(source, columns.candidate_name.as_deref(), "candidate_name")?;
                let party_col = required(source, columns.party_affiliation.as_deref(), "party_affiliation")?;
                let party_idx = source.column(party_col)?;
                let marker = self.settings.form.congress_party_marker.trim();
                single_column(source, columns, key, name_col, |row| {
                    clean_option(TabularSource::cell(row, party_idx)).as_deref() == Some(marker)
                })?
            }
            OptionCategory::CasteOption => {
                let caste_col = required(source, columns.caste_name.as_deref(), "caste_name")?;
                single_column(source, columns, key, caste_col, |_| true)?
            }
        };

        debug!("[选区 {}] {} 提取到 {} 个原始选项", key, category, extracted.len());
        Ok(OptionList::new(extracted, self.fallback(category)))
    }

    /// 政党选项横跨多列，按行 × 列的顺序读取
    fn party_options(
        &self,
        source: &TabularSource,
        columns: &ColumnMap,
        key: ConstituencyKey,
    ) -> Result<Vec<String>, SourceError> {
        let key_idx = source.column(&columns.key)?;
        let option_idxs: Vec<usize> = columns
            .party_options
            .iter()
            .filter_map(|col| match source.column_index(col) {
                Some(idx) => Some(idx),
                None => {
                    debug!("[{}] 政党选项列 {} 不存在，跳过", source.name(), col);
                    None
                }
            })
            .collect();

        let mut values = Vec::new();
        for row in matching_rows(source, key_idx, key) {
            values.extend(option_idxs.iter().filter_map(|idx| clean_option(TabularSource::cell(row, *idx))));
        }
        Ok(values)
    }

    /// 提取全部五个类别
    ///
    /// 单个类别失败只影响该类别，结果总是包含全部类别
    pub fn extract_all(&self, key: ConstituencyKey) -> CategoryOptions {
        OptionCategory::ALL
            .iter()
            .map(|category| {
                let list = self.extract(key, *category).unwrap_or_else(|e| {
                    warn!("[选区 {}] ⚠️ 提取 {} 失败，使用兜底选项: {}", key, category, e);
                    OptionList::fallback_only(self.fallback(*category))
                });
                (*category, list)
            })
            .collect()
    }

    /// 记录只剩兜底选项的类别
    pub fn log_availability(&self, key: ConstituencyKey, options: &CategoryOptions) -> usize {
        let mut fallback_only = 0;
        for (category, list) in options {
            if list.is_fallback_only(self.fallback(*category)) {
                warn!("[选区 {}] ⚠️ {} 没有提取到数据，只有兜底选项", key, category);
                fallback_only += 1;
            }
        }
        if fallback_only == 0 {
            info!("[选区 {}] ✓ 所有类别均有数据", key);
        }
        fallback_only
    }
}

/// 类别 → 数据表
fn source_table(category: OptionCategory) -> TableKind {
    match category {
        OptionCategory::PartyOption => TableKind::ConstituencyParties,
        OptionCategory::MpCandidate => TableKind::GeneralElection,
        OptionCategory::MlaCandidate | OptionCategory::CongressCandidate => TableKind::AssemblyCandidates,
        OptionCategory::CasteOption => TableKind::CasteData,
    }
}

fn required<'c>(source: &TabularSource, column: Option<&'c str>, name: &str) -> Result<&'c str, SourceError> {
    column.ok_or_else(|| SourceError::MissingColumn {
        table: source.name().to_string(),
        column: name.to_string(),
    })
}

/// 编号列等于目标选区的行
///
/// 两侧都规范化为 ConstituencyKey 后比较，无效编号的行不会匹配
fn matching_rows<'s>(
    source: &'s TabularSource,
    key_idx: usize,
    key: ConstituencyKey,
) -> impl Iterator<Item = &'s [Cell]> + 's {
    source
        .rows()
        .filter(move |row| validate_cell(TabularSource::cell(row, key_idx)).ok() == Some(key))
}

fn single_column(
    source: &TabularSource,
    columns: &ColumnMap,
    key: ConstituencyKey,
    value_col: &str,
    keep: impl Fn(&[Cell]) -> bool,
) -> Result<Vec<String>, SourceError> {
    let key_idx = source.column(&columns.key)?;
    let value_idx = source.column(value_col)?;
    Ok(matching_rows(source, key_idx, key)
        .filter(|row| keep(*row))
        .filter_map(|row| clean_option(TabularSource::cell(row, value_idx)))
        .collect())
}
