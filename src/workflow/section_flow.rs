//! 分区提交流程 - 流程层
//!
//! 核心职责：定义"一个分区"的完整提交流程
//!
//! 流程顺序：
//! 1. 校验分区起点与表单当前条目数一致
//! 2. 作为一个批次提交
//! 3. 把返回的条目 ID 记入分区映射

use crate::error::{AppResult, DocumentError};
use crate::infrastructure::FormsApi;
use crate::models::{CompiledSection, SectionMapping};
use crate::services::MutationExecutor;
use crate::utils::logging::truncate_text;
use crate::workflow::section_ctx::SectionCtx;
use tracing::{debug, error, info};

/// 分区提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionResult {
    /// 已创建的条目数
    pub created: usize,
    /// 提交后表单中的条目总数
    pub items_after: usize,
}

/// 分区提交流程
///
/// - 不持有任何资源（表单 API 由 executor 持有）
/// - 只处理单个分区
/// - 维护"表单中已有多少条目"，保证下一个分区从正确的位置开始
pub struct SectionFlow {
    items_on_form: usize,
    verbose_logging: bool,
}

impl SectionFlow {
    /// 创建新的分区提交流程
    pub fn new(verbose_logging: bool) -> Self {
        Self {
            items_on_form: 0,
            verbose_logging,
        }
    }

    /// 表单中已提交的条目数
    pub fn items_on_form(&self) -> usize {
        self.items_on_form
    }

    /// 提交一个分区并记录条目 ID
    ///
    /// # 参数
    /// - `executor`: 批量提交服务
    /// - `section`: 编译好的分区
    /// - `ctx`: 日志上下文
    /// - `mapping`: 分区到条目 ID 的映射，成功后写入
    ///
    /// # 返回
    /// 分区起点与已提交条目数不一致时返回 `PositionMismatch`，不发出任何请求
    pub async fn run<A: FormsApi>(
        &mut self,
        executor: &mut MutationExecutor<A>,
        section: &CompiledSection,
        ctx: &SectionCtx,
        mapping: &mut SectionMapping,
    ) -> AppResult<SectionResult> {
        info!("{} 📤 提交 {} 个条目...", ctx, section.len());

        if section.start_index() != self.items_on_form {
            error!(
                "{} ❌ 分区起点 {} 与表单当前条目数 {} 不一致",
                ctx,
                section.start_index(),
                self.items_on_form
            );
            return Err(DocumentError::PositionMismatch {
                section: section.name.label(),
                expected: self.items_on_form,
                actual: section.start_index(),
            }
            .into());
        }

        let ids = executor.submit(&ctx.form_id, section).await?;

        if self.verbose_logging {
            for (positioned, id) in section.items.iter().zip(&ids) {
                debug!(
                    "{} 位置 {} → {} ({})",
                    ctx,
                    positioned.index,
                    id,
                    truncate_text(positioned.item.title().unwrap_or("分页"), 40)
                );
            }
        }

        let created = ids.len();
        mapping.record(&section.name, ids);
        self.items_on_form = section.end_index();

        info!("{} ✓ 已创建 {} 个条目", ctx, created);
        Ok(SectionResult {
            created,
            items_after: self.items_on_form,
        })
    }
}
