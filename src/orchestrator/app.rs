//! 应用入口 - 编排层
//!
//! 管理一次运行的生命周期：加载配置和数据 → 生成表单 → 保存元数据 → 输出摘要

use crate::config::{Config, Settings};
use crate::error::AppError;
use crate::infrastructure::{load_workbook, FormsApi, FormsClient, SourceSet};
use crate::models::{load_catalog, load_settings, FormMetadata, QuestionCatalog};
use crate::orchestrator::form_processor::FormBuilder;
use crate::services::{MutationExecutor, RetryPolicy};
use crate::utils::logging::{log_startup, print_summary};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// 应用主结构
pub struct App {
    config: Config,
    settings: Settings,
    catalog: QuestionCatalog,
    sources: SourceSet,
}

impl App {
    /// 初始化应用
    ///
    /// 任何配置或数据文件问题都在发出远程请求之前报告
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let settings = load_settings(Path::new(&config.settings_file))
            .await
            .context("加载设置失败")?;
        let catalog = load_catalog(Path::new(&config.questions_file))
            .await
            .context("加载题目文本失败")?;

        let excel_path = config.excel_file_path.clone();
        let excel_settings = settings.excel.clone();
        let sources = tokio::task::spawn_blocking(move || load_workbook(Path::new(&excel_path), &excel_settings))
            .await
            .context("读取Excel任务异常终止")?
            .map_err(AppError::from)
            .context("加载数据文件失败")?;

        Ok(Self::from_parts(config, settings, catalog, sources))
    }

    /// 由已加载的各部分构造
    pub fn from_parts(config: Config, settings: Settings, catalog: QuestionCatalog, sources: SourceSet) -> Self {
        Self {
            config,
            settings,
            catalog,
            sources,
        }
    }

    /// 使用 HTTP 客户端运行
    pub async fn run(&self) -> Result<FormMetadata> {
        let client = FormsClient::new(&self.config).map_err(AppError::from)?;
        self.run_with(client).await
    }

    /// 使用给定的表单 API 运行
    pub async fn run_with<A: FormsApi>(&self, api: A) -> Result<FormMetadata> {
        let executor = MutationExecutor::new(api, RetryPolicy::from_settings(&self.settings.retry));
        let mut builder = FormBuilder::new(executor, &self.catalog, &self.settings, &self.config);

        let outcome = builder.build(&self.sources).await.context("生成问卷失败")?;

        save_metadata(Path::new(&self.config.metadata_output_file), &outcome.metadata).await?;
        print_summary(&outcome.metadata, &outcome.options, &self.config.metadata_output_file);

        Ok(outcome.metadata)
    }
}

/// 保存元数据（仅供参考，不是权威状态）
pub async fn save_metadata(path: &Path, metadata: &FormMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).context("序列化元数据失败")?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    info!("✓ 元数据已保存: {}", path.display());
    Ok(())
}
