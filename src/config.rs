use crate::error::ConfigError;
use crate::models::option::OptionCategory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// TOML 设置文件路径
    pub settings_file: String,
    /// 双语题目文本文件路径
    pub questions_file: String,
    /// Excel 数据文件路径
    pub excel_file_path: String,
    /// 介绍语中替换 [caller_name] 的名字
    pub caller_name: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 元数据输出文件
    pub metadata_output_file: String,
    /// 只生成这些选区（为空表示全部）
    pub target_keys: Vec<u32>,
    // --- 表单 API 配置 ---
    pub forms_api_base_url: String,
    pub drive_api_base_url: String,
    pub forms_access_token: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_file: "settings.toml".to_string(),
            questions_file: "questions.json".to_string(),
            excel_file_path: "survey_data.xlsx".to_string(),
            caller_name: "Political Survey Team".to_string(),
            verbose_logging: false,
            metadata_output_file: "form_metadata.json".to_string(),
            target_keys: Vec::new(),
            forms_api_base_url: "https://forms.googleapis.com/v1".to_string(),
            drive_api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            forms_access_token: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            settings_file: std::env::var("SETTINGS_FILE").unwrap_or(default.settings_file),
            questions_file: std::env::var("QUESTIONS_FILE").unwrap_or(default.questions_file),
            excel_file_path: std::env::var("EXCEL_FILE_PATH").unwrap_or(default.excel_file_path),
            caller_name: std::env::var("CALLER_NAME").unwrap_or(default.caller_name),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            metadata_output_file: std::env::var("METADATA_OUTPUT_FILE").unwrap_or(default.metadata_output_file),
            target_keys: std::env::var("TARGET_KEYS").ok().map(|v| parse_target_keys(&v)).unwrap_or(default.target_keys),
            forms_api_base_url: std::env::var("FORMS_API_BASE_URL").unwrap_or(default.forms_api_base_url),
            drive_api_base_url: std::env::var("DRIVE_API_BASE_URL").unwrap_or(default.drive_api_base_url),
            forms_access_token: std::env::var("FORMS_ACCESS_TOKEN").unwrap_or(default.forms_access_token),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
        }
    }
}

/// 解析逗号分隔的选区列表，忽略无法解析的片段
fn parse_target_keys(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .collect()
}

// ========== TOML 设置 ==========

/// 设置文件（settings.toml）
///
/// 所有字段都有默认值，缺省的部分按默认值补齐
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub excel: ExcelSettings,
    pub form: FormSettings,
    pub retry: RetrySettings,
    pub fallbacks: FallbackTable,
}

/// 四张逻辑数据表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// 选区-政党选项表
    ConstituencyParties,
    /// 大选候选人表
    GeneralElection,
    /// 议会候选人表（带政党归属）
    AssemblyCandidates,
    /// 种姓数据表
    CasteData,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::ConstituencyParties,
        TableKind::GeneralElection,
        TableKind::AssemblyCandidates,
        TableKind::CasteData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::ConstituencyParties => "constituency_parties",
            TableKind::GeneralElection => "general_election",
            TableKind::AssemblyCandidates => "assembly_candidates",
            TableKind::CasteData => "caste_data",
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcelSettings {
    pub sheets: SheetNames,
    pub columns: TableColumns,
}

/// 逻辑表 → 工作表名
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    #[serde(alias = "ac_pc")]
    pub constituency_parties: String,
    #[serde(alias = "ge2024")]
    pub general_election: String,
    #[serde(alias = "mla_p2")]
    pub assembly_candidates: String,
    pub caste_data: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            constituency_parties: "AC<>PC".to_string(),
            general_election: "GE2024".to_string(),
            assembly_candidates: "MLA_P2".to_string(),
            caste_data: "Caste_Data".to_string(),
        }
    }
}

impl SheetNames {
    pub fn for_table(&self, table: TableKind) -> &str {
        match table {
            TableKind::ConstituencyParties => &self.constituency_parties,
            TableKind::GeneralElection => &self.general_election,
            TableKind::AssemblyCandidates => &self.assembly_candidates,
            TableKind::CasteData => &self.caste_data,
        }
    }
}

/// 单张表的列引用
///
/// 列引用可以是表头文字，也可以是 Excel 列字母（A、B、…、AA）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    #[serde(alias = "ac_number")]
    pub key: String,
    pub candidate_name: Option<String>,
    pub party_affiliation: Option<String>,
    pub caste_name: Option<String>,
    pub party_options: Vec<String>,
}

impl ColumnMap {
    /// 校验表结构时必须存在的列
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.key.as_str()];
        for col in [&self.candidate_name, &self.party_affiliation, &self.caste_name]
            .into_iter()
            .flatten()
        {
            cols.push(col.as_str());
        }
        cols
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableColumns {
    #[serde(alias = "ac_pc")]
    pub constituency_parties: ColumnMap,
    #[serde(alias = "ge2024")]
    pub general_election: ColumnMap,
    #[serde(alias = "mla_p2")]
    pub assembly_candidates: ColumnMap,
    pub caste_data: ColumnMap,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            constituency_parties: ColumnMap {
                key: "C".to_string(),
                party_options: ('H'..='T').map(|c| c.to_string()).collect(),
                ..Default::default()
            },
            general_election: ColumnMap {
                key: "B".to_string(),
                candidate_name: Some("E".to_string()),
                ..Default::default()
            },
            assembly_candidates: ColumnMap {
                key: "B".to_string(),
                candidate_name: Some("D".to_string()),
                party_affiliation: Some("E".to_string()),
                ..Default::default()
            },
            caste_data: ColumnMap {
                key: "A".to_string(),
                caste_name: Some("B".to_string()),
                ..Default::default()
            },
        }
    }
}

impl TableColumns {
    pub fn for_table(&self, table: TableKind) -> &ColumnMap {
        match table {
            TableKind::ConstituencyParties => &self.constituency_parties,
            TableKind::GeneralElection => &self.general_election,
            TableKind::AssemblyCandidates => &self.assembly_candidates,
            TableKind::CasteData => &self.caste_data,
        }
    }
}

/// 表单外观设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    #[serde(alias = "form_title_prefix")]
    pub title_prefix: String,
    pub description: String,
    /// 选区显示标签前缀，如 "Constituency 111"
    pub key_label_prefix: String,
    /// 国大党候选人的政党标记
    pub congress_party_marker: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            title_prefix: "Political Survey".to_string(),
            description: "Political Survey for Assembly Constituencies".to_string(),
            key_label_prefix: "Constituency".to_string(),
            congress_party_marker: "INC".to_string(),
        }
    }
}

/// 重试设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// 总调用次数（含首次请求）
    #[serde(alias = "retry_attempts")]
    pub attempts: u32,
    /// 基础等待秒数，第 i 次重试前等待 delay * 2^i
    #[serde(alias = "retry_delay")]
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 2,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// 各类别的兜底选项（追加在提取结果之后）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTable {
    pub party_options: Vec<String>,
    pub mp_candidates: Vec<String>,
    pub mla_candidates: Vec<String>,
    pub congress_candidates: Vec<String>,
    pub caste_options: Vec<String>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        let open_field = || to_strings(&["Other Parties", "Independent Candidate", "NOTA", "Not Sure"]);
        Self {
            party_options: open_field(),
            mp_candidates: open_field(),
            mla_candidates: open_field(),
            congress_candidates: to_strings(&["NOTA", "Not Sure"]),
            caste_options: to_strings(&["Other Caste", "Do not want to Answer"]),
        }
    }
}

impl FallbackTable {
    pub fn tokens(&self, category: OptionCategory) -> &[String] {
        match category {
            OptionCategory::PartyOption => &self.party_options,
            OptionCategory::MpCandidate => &self.mp_candidates,
            OptionCategory::MlaCandidate => &self.mla_candidates,
            OptionCategory::CongressCandidate => &self.congress_candidates,
            OptionCategory::CasteOption => &self.caste_options,
        }
    }

    /// 每个类别至少要有一个非空白的兜底选项
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in OptionCategory::ALL {
            if self.tokens(category).iter().all(|token| token.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    name: format!("fallbacks.{}", category),
                    reason: "至少需要一个兜底选项".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
