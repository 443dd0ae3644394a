//! 表单生成器 - 编排层
//!
//! ## 职责
//!
//! 把一次运行串起来：收集选区 → 提取选项 → 编译文档 → 创建表单 → 逐个分区提交。
//!
//! ## 核心功能
//!
//! 1. **选区收集**：汇总所有数据表的有效选区，按需限制为指定选区
//! 2. **选项提取**：逐个选区提取五个类别，并输出校验摘要
//! 3. **文档编译**：一次性编译全部分区，游标贯穿整个文档
//! 4. **顺序提交**：分区严格按顺序提交，前一个完成后才开始下一个
//! 5. **失败清理**：任何提交阶段失败都会尝试删除未完成的表单

use crate::config::{Config, Settings};
use crate::error::{AppResult, DocumentError};
use crate::infrastructure::forms_client::{edit_url, view_url};
use crate::infrastructure::{FormsApi, SourceSet};
use crate::models::{
    CategoryOptions, CompiledDocument, ConstituencyKey, FormMetadata, QuestionCatalog, SectionMapping,
};
use crate::services::{DocumentCompiler, KeyResolver, MutationExecutor, OptionExtractor};
use crate::utils::logging::{log_data_summary, log_stage};
use crate::workflow::{SectionCtx, SectionFlow};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info, warn};

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub metadata: FormMetadata,
    /// 各选区提取到的选项
    pub options: BTreeMap<ConstituencyKey, CategoryOptions>,
}

/// 表单生成器
pub struct FormBuilder<'a, A: FormsApi> {
    executor: MutationExecutor<A>,
    catalog: &'a QuestionCatalog,
    settings: &'a Settings,
    config: &'a Config,
}

impl<'a, A: FormsApi> FormBuilder<'a, A> {
    /// 创建生成器
    ///
    /// # 参数
    /// - `executor`: 持有表单 API 的批量提交服务
    /// - `catalog`: 双语题目目录
    /// - `settings`: 文件设置（表名、列、兜底选项、重试）
    /// - `config`: 进程配置（调用人姓名、目标选区、输出文件）
    pub fn new(
        executor: MutationExecutor<A>,
        catalog: &'a QuestionCatalog,
        settings: &'a Settings,
        config: &'a Config,
    ) -> Self {
        Self {
            executor,
            catalog,
            settings,
            config,
        }
    }

    pub fn executor(&self) -> &MutationExecutor<A> {
        &self.executor
    }

    /// 表单标题
    pub fn form_title(&self) -> String {
        format!("{} Multiple Constituencies", self.settings.form.title_prefix)
    }

    /// 执行一次完整的生成
    ///
    /// # 返回
    /// 返回表单元数据和各选区的选项；表单创建后的任何失败都会先尝试删除表单
    pub async fn build(&mut self, sources: &SourceSet) -> AppResult<BuildOutcome> {
        // ========== 阶段 1: 收集选区 ==========
        log_stage("收集选区");
        let all_keys = KeyResolver::new(sources, &self.settings.excel.columns).collect_all()?;
        let keys = select_targets(all_keys, &self.config.target_keys)?;
        log_data_summary(&sources.data_summary(), keys.len());

        // ========== 阶段 2: 提取选项 ==========
        log_stage("提取选项");
        let extractor = OptionExtractor::new(sources, self.settings);
        let mut options = BTreeMap::new();
        let mut sparse = 0;
        for key in &keys {
            let categories = extractor.extract_all(*key);
            sparse += extractor.log_availability(*key, &categories);
            options.insert(*key, categories);
        }
        if sparse > 0 {
            warn!("⚠️ 共有 {} 个类别只使用了兜底选项", sparse);
        }

        // ========== 阶段 3: 编译文档 ==========
        log_stage("编译文档");
        let mut compiler = DocumentCompiler::new(self.catalog, self.settings, self.config.caller_name.clone());
        let document = compiler.compile_document(&options);

        // ========== 阶段 4: 创建表单并提交 ==========
        log_stage("创建表单");
        let title = self.form_title();
        let created = self.executor.create_form(&title).await?;
        let form_id = created.form_id.clone();

        let mapping = match self.populate(&form_id, &document).await {
            Ok(mapping) => mapping,
            Err(e) => {
                error!("❌ 表单 {} 生成失败: {}", form_id, e);
                self.executor.cleanup(&form_id).await;
                return Err(e);
            }
        };

        let metadata = FormMetadata {
            edit_url: edit_url(&form_id),
            public_url: created.responder_uri.unwrap_or_else(|| view_url(&form_id)),
            form_id,
            title,
            total_constituencies: keys.len(),
            constituency_keys: document.constituency_order(),
            section_mapping: mapping,
            creation_timestamp: chrono::Local::now().to_rfc3339(),
        };

        Ok(BuildOutcome { metadata, options })
    }

    /// 更新说明并按顺序提交所有分区
    async fn populate(&mut self, form_id: &str, document: &CompiledDocument) -> AppResult<SectionMapping> {
        self.executor
            .update_description(form_id, &self.settings.form.description)
            .await?;

        log_stage("提交分区");
        let mut flow = SectionFlow::new(self.config.verbose_logging);
        let mut mapping = document.mapping.clone();
        let total = document.sections.len();

        for (i, section) in document.sections.iter().enumerate() {
            let ctx = SectionCtx::new(form_id, section.name, i + 1, total);
            if let Err(e) = flow.run(&mut self.executor, section, &ctx, &mut mapping).await {
                error!("{} ❌ 在此阶段失败，远端表单可能只完成了一部分", ctx);
                return Err(e);
            }
        }

        info!("✓ 全部 {} 个分区提交完成，共 {} 个条目", total, flow.items_on_form());
        Ok(mapping)
    }
}

/// 按指定选区过滤；未指定时保留全部
///
/// # 参数
/// - `keys`: 所有有效选区
/// - `targets`: 指定的选区编号，为空表示不过滤
///
/// # 返回
/// 返回选中的选区；指定了不存在的选区时返回 `MissingTargetKeys`，
/// 选中结果为空时返回 `Incomplete`
pub fn select_targets(
    keys: BTreeSet<ConstituencyKey>,
    targets: &[u32],
) -> Result<BTreeSet<ConstituencyKey>, DocumentError> {
    if targets.is_empty() {
        return Ok(keys);
    }

    let mut missing = Vec::new();
    let mut selected = BTreeSet::new();
    for raw in targets {
        match ConstituencyKey::new(*raw).filter(|k| keys.contains(k)) {
            Some(key) => {
                selected.insert(key);
            }
            None => missing.push(*raw),
        }
    }

    if !missing.is_empty() {
        return Err(DocumentError::MissingTargetKeys { missing });
    }
    if selected.is_empty() {
        return Err(DocumentError::Incomplete);
    }
    info!("🎯 只生成 {} 个指定选区", selected.len());
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError};
    use crate::models::catalog::fixtures;
    use crate::services::mutation_executor::mock::ScriptedApi;
    use crate::services::option_extractor::fixtures as sources;
    use crate::services::RetryPolicy;
    use serde_json::json;

    fn keys(ns: &[u32]) -> BTreeSet<ConstituencyKey> {
        ns.iter().filter_map(|n| ConstituencyKey::new(*n)).collect()
    }

    #[test]
    fn test_select_targets() {
        assert_eq!(select_targets(keys(&[1, 2, 3]), &[]).unwrap(), keys(&[1, 2, 3]));
        assert_eq!(select_targets(keys(&[1, 2, 3]), &[3, 1]).unwrap(), keys(&[1, 3]));
        match select_targets(keys(&[1, 2]), &[2, 9]) {
            Err(DocumentError::MissingTargetKeys { missing }) => assert_eq!(missing, vec![9]),
            other => panic!("{:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_end_to_end() {
        let catalog = fixtures::catalog();
        let settings = Settings::default();
        let config = Config::default();
        let executor = MutationExecutor::new(ScriptedApi::default(), RetryPolicy::default());
        let mut builder = FormBuilder::new(executor, &catalog, &settings, &config);

        let outcome = builder.build(&sources::sources()).await.unwrap();
        let metadata = &outcome.metadata;

        assert_eq!(metadata.title, "Political Survey Multiple Constituencies");
        assert_eq!(metadata.total_constituencies, 3);
        assert_eq!(metadata.section_mapping.total_items(), 33);
        assert_eq!(metadata.public_url, view_url("form-1"));
        assert_eq!(outcome.options.len(), 3);
        // 说明更新 + 6 个分区
        assert_eq!(builder.executor().api().call_count(), 7);
    }

    #[tokio::test]
    async fn test_fatal_submit_triggers_cleanup() {
        let catalog = fixtures::catalog();
        let settings = Settings::default();
        let config = Config::default();
        let api = ScriptedApi::with_replies(vec![
            Ok(json!({})),
            Ok(json!({})),
            Err(ApiError::from_status("forms.batchUpdate", 400, "bad item")),
        ]);
        let executor = MutationExecutor::new(api, RetryPolicy::default());
        let mut builder = FormBuilder::new(executor, &catalog, &settings, &config);

        let err = builder.build(&sources::sources()).await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Fatal { .. })));
        assert_eq!(builder.executor().api().deleted.lock().unwrap().as_slice(), &["form-1".to_string()]);
    }

    #[tokio::test]
    async fn test_no_valid_keys_stops_before_remote_calls() {
        let catalog = fixtures::catalog();
        let settings = Settings::default();
        let config = Config::default();
        let executor = MutationExecutor::new(ScriptedApi::default(), RetryPolicy::default());
        let mut builder = FormBuilder::new(executor, &catalog, &settings, &config);

        let err = builder.build(&SourceSet::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Document(DocumentError::Incomplete)));
        assert_eq!(builder.executor().api().call_count(), 0);
    }
}
