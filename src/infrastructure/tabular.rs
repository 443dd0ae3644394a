//! 表格数据源 - 基础设施层
//!
//! 只负责把工作簿读成只读的行列视图，不理解选区或选项

use crate::config::{ExcelSettings, TableKind};
use crate::error::SourceError;
use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// 单元格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// 单元格的原始文本，空单元格返回 None
    ///
    /// 整数值的浮点数输出为不带小数的形式
    pub fn as_raw(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&DataType> for Cell {
    fn from(dt: &DataType) -> Self {
        match dt {
            DataType::Empty | DataType::Error(_) => Cell::Empty,
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Float(f) => Cell::Number(*f),
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Bool(b) => Cell::Bool(*b),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// 一张表的只读视图
#[derive(Debug, Clone)]
pub struct TabularSource {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TabularSource {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// 由工作表区域构造，第一行为表头
    pub fn from_range(name: impl Into<String>, range: &Range<DataType>) -> Self {
        let mut iter = range.rows();
        let headers: Vec<String> = iter
            .next()
            .map(|row| {
                row.iter()
                    .map(|c| Cell::from(c).as_raw().unwrap_or_default().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let rows: Vec<Vec<Cell>> = iter.map(|row| row.iter().map(Cell::from).collect()).collect();
        Self::new(name, headers, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// 按列引用查找列位置
    ///
    /// 先按表头文字精确匹配，再按 Excel 列字母解析
    pub fn column_index(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim();
        if let Some(idx) = self.headers.iter().position(|h| h == reference) {
            return Some(idx);
        }
        column_letter_index(reference).filter(|idx| *idx < self.headers.len())
    }

    pub fn column(&self, reference: &str) -> Result<usize, SourceError> {
        self.column_index(reference)
            .ok_or_else(|| SourceError::MissingColumn {
                table: self.name.clone(),
                column: reference.to_string(),
            })
    }

    /// 越界的单元格视为空
    pub fn cell<'a>(row: &'a [Cell], idx: usize) -> &'a Cell {
        const EMPTY: &Cell = &Cell::Empty;
        row.get(idx).unwrap_or(EMPTY)
    }

    /// 校验表结构：非空且包含所有必需列
    pub fn validate_structure(&self, required: &[&str]) -> Result<(), SourceError> {
        if self.rows.is_empty() {
            return Err(SourceError::EmptySheet {
                table: self.name.clone(),
            });
        }
        for col in required {
            self.column(col)?;
        }
        Ok(())
    }
}

/// "A" → 0, "Z" → 25, "AA" → 26
fn column_letter_index(reference: &str) -> Option<usize> {
    if reference.is_empty() || reference.len() > 3 || !reference.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut idx = 0usize;
    for c in reference.chars() {
        idx = idx * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(idx - 1)
}

/// 表格摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table: TableKind,
    pub sheet_name: String,
    pub rows: usize,
    pub columns: usize,
}

/// 已加载的全部数据表
///
/// 结构不合格的表不会出现在这里，对应类别按兜底处理
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    tables: HashMap<TableKind, TabularSource>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableKind, source: TabularSource) {
        self.tables.insert(table, source);
    }

    pub fn get(&self, table: TableKind) -> Result<&TabularSource, SourceError> {
        self.tables.get(&table).ok_or_else(|| SourceError::Missing {
            table: table.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// 每张已加载表的行列数
    pub fn data_summary(&self) -> Vec<TableSummary> {
        TableKind::ALL
            .iter()
            .filter_map(|kind| {
                self.tables.get(kind).map(|src| TableSummary {
                    table: *kind,
                    sheet_name: src.name().to_string(),
                    rows: src.row_count(),
                    columns: src.column_count(),
                })
            })
            .collect()
    }

    /// 校验结构并加入集合，不合格时记录原因并跳过
    pub fn insert_validated(&mut self, table: TableKind, source: TabularSource, required: &[&str]) {
        match source.validate_structure(required) {
            Ok(()) => {
                info!("✓ 已加载数据表 '{}' ({} 行)", source.name(), source.row_count());
                self.insert(table, source);
            }
            Err(e) => {
                warn!("⚠️ 数据表 {} 结构校验失败，相关题目将使用兜底选项: {}", table, e);
            }
        }
    }
}

/// 从 Excel 文件加载四张逻辑表
///
/// # 参数
/// - `path`: 工作簿路径
/// - `excel`: 工作表名称和列设置
///
/// # 返回
/// 文件无法打开时返回错误；单张工作表缺失或不合格时只记录警告
pub fn load_workbook(path: &Path, excel: &ExcelSettings) -> Result<SourceSet, SourceError> {
    info!("📁 正在加载Excel文件: {}", path.display());
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| SourceError::OpenFailed {
        path: path.display().to_string(),
        source,
    })?;

    let mut sources = SourceSet::new();
    for table in TableKind::ALL {
        let sheet_name = excel.sheets.for_table(table);
        let range = match workbook.worksheet_range(sheet_name) {
            Some(Ok(range)) => range,
            Some(Err(e)) => {
                warn!("⚠️ 读取工作表 '{}' 失败: {}", sheet_name, e);
                continue;
            }
            None => {
                warn!("⚠️ 工作表 '{}' 不存在", sheet_name);
                continue;
            }
        };
        debug!("工作表 '{}' 区域大小: {:?}", sheet_name, range.get_size());
        let source = TabularSource::from_range(sheet_name, &range);
        let columns = excel.columns.for_table(table);
        sources.insert_validated(table, source, &columns.required_columns());
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TabularSource {
        TabularSource::new(
            "GE2024",
            vec!["A".into(), "B".into(), "Candidate".into()],
            vec![
                vec![Cell::Empty, Cell::Number(111.0), " Candidate A  ".into()],
                vec![Cell::Empty, "112".into()],
            ],
        )
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter_index("A"), Some(0));
        assert_eq!(column_letter_index("t"), Some(19));
        assert_eq!(column_letter_index("AA"), Some(26));
        assert_eq!(column_letter_index("A1"), None);
        assert_eq!(column_letter_index(""), None);
    }

    #[test]
    fn test_column_lookup_prefers_header_text() {
        let src = sample();
        assert_eq!(src.column_index("Candidate"), Some(2));
        assert_eq!(src.column_index("B"), Some(1));
        assert_eq!(src.column_index("C"), Some(2));
        assert_eq!(src.column_index("Z"), None);
        assert!(matches!(src.column("Party"), Err(SourceError::MissingColumn { .. })));
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let src = sample();
        let row = src.rows().nth(1).unwrap();
        assert_eq!(TabularSource::cell(row, 2), &Cell::Empty);
    }

    #[test]
    fn test_raw_number_formatting() {
        assert_eq!(Cell::Number(12.0).as_raw(), Some("12".to_string()));
        assert_eq!(Cell::Number(12.5).as_raw(), Some("12.5".to_string()));
        assert_eq!(Cell::Empty.as_raw(), None);
    }

    #[test]
    fn test_validate_structure() {
        let src = sample();
        assert!(src.validate_structure(&["B", "Candidate"]).is_ok());
        let empty = TabularSource::new("Caste_Data", vec!["A".into()], vec![]);
        assert!(matches!(
            empty.validate_structure(&["A"]),
            Err(SourceError::EmptySheet { .. })
        ));
    }

    #[test]
    fn test_invalid_table_is_skipped() {
        let mut set = SourceSet::new();
        set.insert_validated(TableKind::GeneralElection, sample(), &["B", "Missing"]);
        assert!(set.get(TableKind::GeneralElection).is_err());
        set.insert_validated(TableKind::GeneralElection, sample(), &["B"]);
        assert_eq!(set.data_summary().len(), 1);
        assert_eq!(set.data_summary()[0].rows, 2);
    }

    #[test]
    fn test_missing_workbook() {
        let err = load_workbook(Path::new("/nonexistent/survey.xlsx"), &ExcelSettings::default());
        assert!(matches!(err, Err(SourceError::OpenFailed { .. })));
    }
}
