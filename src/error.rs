use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 选区编号错误
    #[error("选区编号错误: {0}")]
    Key(#[from] KeyError),
    /// 数据表错误
    #[error("数据表错误: {0}")]
    Source(#[from] SourceError),
    /// 远程 API 错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文档无法生成
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 选区编号无效的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKeyReason {
    Empty,
    NonNumeric,
    NonPositive,
    OutOfRange,
}

impl std::fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            InvalidKeyReason::Empty => "编号为空",
            InvalidKeyReason::NonNumeric => "不是有效数字",
            InvalidKeyReason::NonPositive => "必须为正整数",
            InvalidKeyReason::OutOfRange => "数值超出范围",
        };
        f.write_str(text)
    }
}

/// 选区编号校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// 原始值无法转换为选区编号
    #[error("无效的选区编号 '{raw}': {reason}")]
    Invalid {
        raw: String,
        reason: InvalidKeyReason,
    },
}

/// 数据表相关错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 无法打开 Excel 文件
    #[error("无法打开Excel文件 {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: calamine::XlsxError,
    },
    /// 数据表不存在或未加载
    #[error("数据表 '{table}' 不可用")]
    Missing { table: String },
    /// 数据表为空
    #[error("数据表 '{table}' 为空")]
    EmptySheet { table: String },
    /// 数据表缺少必需列
    #[error("数据表 '{table}' 缺少列: {column}")]
    MissingColumn { table: String, column: String },
}

/// 远程文档 API 错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 可重试的瞬时错误（频率限制、服务端错误、网络超时）
    #[error("瞬时错误 ({endpoint}): status={status:?}, {message}")]
    Transient {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    /// 请求被拒绝，不可重试
    #[error("请求被拒绝 ({endpoint}): status={status:?}, {message}")]
    Rejected {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    /// 响应缺少必需字段
    #[error("响应格式异常 ({label}): {detail}")]
    UnexpectedReplyShape { label: String, detail: String },
    /// 同一批次重复提交
    #[error("批次 {label} 已提交过，拒绝重复提交")]
    DuplicateBatch { label: String },
    /// 批次最终失败，终止本次运行
    #[error("批次 {label} 失败 (共尝试 {attempts} 次): {cause}")]
    Fatal {
        label: String,
        attempts: u32,
        #[source]
        cause: Box<ApiError>,
    },
}

impl ApiError {
    /// 是否属于可重试的错误类别
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient { .. })
    }

    /// 按 HTTP 状态码归类错误
    ///
    /// 429 与 5xx 视为瞬时错误，其余均不可重试
    pub fn from_status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let message = message.into();
        if status == 429 || (500..600).contains(&status) {
            ApiError::Transient {
                endpoint,
                status: Some(status),
                message,
            }
        } else {
            ApiError::Rejected {
                endpoint,
                status: Some(status),
                message,
            }
        }
    }

    /// 升级为终止本次运行的错误
    pub fn into_fatal(self, label: impl Into<String>, attempts: u32) -> Self {
        match self {
            fatal @ ApiError::Fatal { .. } => fatal,
            other => ApiError::Fatal {
                label: label.into(),
                attempts,
                cause: Box::new(other),
            },
        }
    }
}

/// 文档生成错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 没有任何有效选区，无法生成文档
    #[error("没有找到任何有效的选区编号，无法生成问卷")]
    Incomplete,
    /// 指定的选区不在有效集合中
    #[error("以下选区不在数据中: {missing:?}")]
    MissingTargetKeys { missing: Vec<u32> },
    /// 分区起点与表单中已有条目数不一致
    #[error("分区 {section} 应从位置 {expected} 开始，实际为 {actual}")]
    PositionMismatch {
        section: String,
        expected: usize,
        actual: usize,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 题目文本 JSON 解析失败
    #[error("题目文件解析失败 ({path}): {source}")]
    CatalogParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 配置值无效
    #[error("配置项 {name} 无效: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
