//! 选区编号解析服务 - 业务能力层
//!
//! 校验原始编号，并汇总所有数据表中的有效选区

use crate::config::{TableColumns, TableKind};
use crate::error::{DocumentError, InvalidKeyReason, KeyError};
use crate::infrastructure::{Cell, SourceSet, TabularSource};
use crate::models::ConstituencyKey;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// 校验原始编号
///
/// 去掉首尾空白后按数字解析，允许 "12.0" 这样的小数形式，截断后必须为正整数
pub fn validate(raw: &str) -> Result<ConstituencyKey, KeyError> {
    let invalid = |reason| KeyError::Invalid {
        raw: raw.to_string(),
        reason,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(InvalidKeyReason::Empty));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| invalid(InvalidKeyReason::NonNumeric))?;
    if !value.is_finite() {
        return Err(invalid(InvalidKeyReason::NonNumeric));
    }

    let truncated = value.trunc();
    if truncated <= 0.0 {
        return Err(invalid(InvalidKeyReason::NonPositive));
    }
    if truncated > u32::MAX as f64 {
        return Err(invalid(InvalidKeyReason::OutOfRange));
    }

    ConstituencyKey::new(truncated as u32).ok_or_else(|| invalid(InvalidKeyReason::NonPositive))
}

/// 校验单元格中的编号
pub fn validate_cell(cell: &Cell) -> Result<ConstituencyKey, KeyError> {
    match cell.as_raw() {
        Some(raw) => validate(&raw),
        None => Err(KeyError::Invalid {
            raw: String::new(),
            reason: InvalidKeyReason::Empty,
        }),
    }
}

/// 选区编号解析服务
pub struct KeyResolver<'a> {
    sources: &'a SourceSet,
    columns: &'a TableColumns,
}

impl<'a> KeyResolver<'a> {
    pub fn new(sources: &'a SourceSet, columns: &'a TableColumns) -> Self {
        Self { sources, columns }
    }

    /// 汇总所有数据表中的有效选区
    ///
    /// 无效编号只记录原因，不会中断收集；结果为空时返回错误
    pub fn collect_all(&self) -> Result<BTreeSet<ConstituencyKey>, DocumentError> {
        let mut all_keys = BTreeSet::new();

        for table in TableKind::ALL {
            let source = match self.sources.get(table) {
                Ok(source) => source,
                Err(e) => {
                    warn!("⚠️ 跳过选区收集: {}", e);
                    continue;
                }
            };
            let key_column = &self.columns.for_table(table).key;
            match collect_from_source(source, key_column) {
                Ok(keys) => {
                    info!("✓ 在 {} 中找到 {} 个选区", table, keys.len());
                    all_keys.extend(keys);
                }
                Err(e) => warn!("⚠️ 跳过选区收集: {}", e),
            }
        }

        info!("📊 共找到 {} 个不重复的选区", all_keys.len());

        if all_keys.is_empty() {
            return Err(DocumentError::Incomplete);
        }
        Ok(all_keys)
    }
}

/// 收集一张表中编号列的所有有效选区
fn collect_from_source(
    source: &TabularSource,
    key_column: &str,
) -> Result<BTreeSet<ConstituencyKey>, crate::error::SourceError> {
    let idx = source.column(key_column)?;
    let mut keys = BTreeSet::new();

    for (row_no, row) in source.rows().enumerate() {
        match validate_cell(TabularSource::cell(row, idx)) {
            Ok(key) => {
                keys.insert(key);
            }
            Err(KeyError::Invalid {
                reason: InvalidKeyReason::Empty,
                ..
            }) => {
                debug!("[{}] 第 {} 行选区编号为空，跳过", source.name(), row_no + 2);
            }
            Err(e) => {
                warn!("[{}] 第 {} 行: {}", source.name(), row_no + 2, e);
            }
        }
    }

    Ok(keys)
}
