/// 日志工具模块
///
/// 提供日志初始化以及格式化输出的辅助函数
use crate::config::Config;
use crate::infrastructure::tabular::TableSummary;
use crate::models::{CategoryOptions, ConstituencyKey, FormMetadata};
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 RUST_LOG；未设置时默认 info，详细模式下为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多选区问卷生成模式");
    info!("📁 数据文件: {}", config.excel_file_path);
    info!("📝 题目文件: {}", config.questions_file);
    if !config.target_keys.is_empty() {
        info!("🎯 只生成指定选区: {:?}", config.target_keys);
    }
    info!("{}", "=".repeat(60));
}

/// 记录数据表摘要
pub fn log_data_summary(tables: &[TableSummary], total_keys: usize) {
    info!("\n📊 数据摘要:");
    for table in tables {
        info!(
            "  {} ('{}'): {} 行 × {} 列",
            table.table, table.sheet_name, table.rows, table.columns
        );
    }
    info!("  有效选区: {}", total_keys);
}

/// 记录阶段开始信息
pub fn log_stage(stage: &str) {
    info!("\n{}", "─".repeat(60));
    info!("▶ {}", stage);
    info!("{}", "─".repeat(60));
}

/// 打印最终结果
///
/// # 参数
/// - `metadata`: 表单元数据
/// - `options`: 各选区的选项，用于打印数量
/// - `metadata_file`: 元数据保存路径
pub fn print_summary(metadata: &FormMetadata, options: &BTreeMap<ConstituencyKey, CategoryOptions>, metadata_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 问卷生成完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📋 标题: {}", metadata.title);
    info!("🆔 表单ID: {}", metadata.form_id);
    info!("✏️ 编辑链接: {}", metadata.edit_url);
    info!("🔗 填写链接: {}", metadata.public_url);
    info!("📍 选区数量: {}", metadata.total_constituencies);

    for (key, categories) in options {
        let counts: Vec<String> = categories
            .iter()
            .map(|(category, list)| format!("{}={}", category, list.len()))
            .collect();
        info!("  选区 {}: {}", key, counts.join(", "));
    }

    let mapping = &metadata.section_mapping;
    info!("{}", "─".repeat(60));
    info!("分区结构:");
    info!("  introduction: {} 个条目", mapping.introduction.len());
    info!("  basic_info: {} 个条目", mapping.basic_info.len());
    for (key, ids) in &mapping.constituency_sections {
        info!("  constituency_{}: {} 个条目", key, ids.len());
    }
    info!("  final_section: {} 个条目", mapping.final_section.len());
    info!("✅ 条目总数: {}", mapping.total_items());
    info!("{}", "=".repeat(60));
    info!("\n元数据已保存至: {}", metadata_file);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
