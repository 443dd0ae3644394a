//! 批量提交服务 - 业务能力层
//!
//! 把编译好的分区作为一个批次提交给远程表单，负责：
//! - 瞬时错误的指数退避重试
//! - 重试前核对远端状态，避免同一批次被重复创建
//! - 从响应中取出条目 ID，格式异常时生成合成 ID

use crate::config::RetrySettings;
use crate::error::ApiError;
use crate::infrastructure::{CreatedForm, FormsApi};
use crate::models::CompiledSection;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 重试策略
///
/// 最多调用 `max_attempts` 次（含首次请求），第 i 次重试前等待 `base_delay * 2^i`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.attempts, settings.base_delay())
    }

    /// 第 `retry` 次重试（从 0 开始）前的等待时间
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

/// 批量提交服务
pub struct MutationExecutor<A: FormsApi> {
    api: A,
    policy: RetryPolicy,
    /// 已成功提交的批次标签
    completed: HashSet<String>,
}

impl<A: FormsApi> MutationExecutor<A> {
    pub fn new(api: A, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            completed: HashSet::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_completed(&self, label: &str) -> bool {
        self.completed.contains(label)
    }

    /// 按重试策略执行一次调用
    ///
    /// `call` 收到当前尝试序号（从 0 开始）。只有瞬时错误会重试；
    /// 其他错误或次数耗尽都升级为 Fatal，`attempts` 为实际调用次数
    async fn with_retry<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0u32;
        loop {
            match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    let wait = self.policy.delay_for(attempt);
                    warn!(
                        "[{}] ⚠️ 瞬时错误 (尝试 {}/{}), {} 秒后重试: {}",
                        label,
                        attempt + 1,
                        self.policy.max_attempts,
                        wait.as_secs_f64(),
                        e
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into_fatal(label, attempt + 1)),
            }
        }
    }

    /// 新建表单
    pub async fn create_form(&self, title: &str) -> Result<CreatedForm, ApiError> {
        let created = self.with_retry("create_form", |_| self.api.create_form(title)).await?;
        info!("✓ 已创建表单: {}", created.form_id);
        Ok(created)
    }

    /// 更新表单说明
    pub async fn update_description(&self, form_id: &str, description: &str) -> Result<(), ApiError> {
        let body = json!({
            "requests": [{
                "updateFormInfo": {
                    "info": { "description": description },
                    "updateMask": "description"
                }
            }]
        });
        self.with_retry("form_info", |_| self.api.batch_update(form_id, &body)).await?;
        debug!("表单说明已更新");
        Ok(())
    }

    /// 查询表单当前状态
    pub async fn get_form_info(&self, form_id: &str) -> Result<JsonValue, ApiError> {
        self.with_retry("get_form", |_| self.api.get_form(form_id)).await
    }

    /// 提交一个分区
    ///
    /// 同一批次标签只能成功提交一次。瞬时失败后重试前先查询远端，
    /// 如果该批次的条目已经出现在预期位置，直接采用已有 ID
    ///
    /// # 参数
    /// - `form_id`: 目标表单 ID
    /// - `section`: 编译好的分区，条目位置必须从表单当前条目数开始
    ///
    /// # 返回
    /// 返回按提交顺序排列的条目 ID，数量与分区条目数一致
    pub async fn submit(&mut self, form_id: &str, section: &CompiledSection) -> Result<Vec<String>, ApiError> {
        let label = section.name.label();
        if self.completed.contains(&label) {
            return Err(ApiError::DuplicateBatch { label });
        }

        let body = section.to_batch_request();
        debug!(
            "[{}] 提交 {} 个条目 (位置 {}..{})",
            label,
            section.len(),
            section.start_index(),
            section.end_index()
        );

        let this = &*self;
        let ids = this
            .with_retry(&label, |attempt| this.try_submit(form_id, section, &body, attempt))
            .await
            .map_err(|e| {
                error!("[{}] ❌ 批次提交失败: {}", label, e);
                e
            })?;

        self.completed.insert(label);
        Ok(ids)
    }

    /// 单次提交；重试时先核对远端
    async fn try_submit(
        &self,
        form_id: &str,
        section: &CompiledSection,
        body: &JsonValue,
        attempt: u32,
    ) -> Result<Vec<String>, ApiError> {
        let label = section.name.label();
        if attempt > 0 {
            if let Some(ids) = self.reconcile(form_id, section).await? {
                info!("[{}] ✓ 上次请求已在服务端生效，采用已有的 {} 个条目", label, ids.len());
                return Ok(ids);
            }
        }

        let reply = self.api.batch_update(form_id, body).await?;
        Ok(parse_created_ids(&reply, &label, section.len()))
    }

    /// 核对远端是否已有本批次的条目
    ///
    /// 预期位置上的条目标题全部一致才算已生效。查询本身按重试策略执行，
    /// 仍然失败时返回 Fatal，不再盲目重发
    async fn reconcile(&self, form_id: &str, section: &CompiledSection) -> Result<Option<Vec<String>>, ApiError> {
        let label = format!("{}/reconcile", section.name.label());
        let form = self.with_retry(&label, |_| self.api.get_form(form_id)).await?;

        let existing = match form.get("items").and_then(|v| v.as_array()) {
            Some(items) => items,
            None => return Ok(None),
        };

        Ok(section
            .items
            .iter()
            .map(|positioned| {
                let remote = existing.get(positioned.index)?;
                let remote_title = remote.get("title").and_then(|v| v.as_str()).unwrap_or("");
                if remote_title != positioned.item.title().unwrap_or("") {
                    return None;
                }
                remote.get("itemId").and_then(|v| v.as_str()).map(str::to_string)
            })
            .collect())
    }

    /// 尽力删除部分创建的表单
    ///
    /// 删除失败时记录需要人工处理的表单 ID，返回是否删除成功
    pub async fn cleanup(&self, form_id: &str) -> bool {
        warn!("🧹 正在删除未完成的表单: {}", form_id);
        match self.with_retry("cleanup", |_| self.api.delete_form(form_id)).await {
            Ok(()) => {
                info!("✓ 已删除未完成的表单: {}", form_id);
                true
            }
            Err(e) => {
                error!(
                    "❌ 无法删除未完成的表单 {}，需要人工检查并手动删除: {}",
                    form_id, e
                );
                false
            }
        }
    }
}

/// 从 batchUpdate 响应中按顺序取出条目 ID
///
/// # 参数
/// - `reply`: batchUpdate 的原始响应
/// - `label`: 批次标签，用于合成 ID 和日志
/// - `expected`: 本批次提交的条目数
///
/// # 返回
/// 总是返回 `expected` 个 ID；缺失的位置使用 `{label}_{序号}` 合成 ID
pub fn parse_created_ids(reply: &JsonValue, label: &str, expected: usize) -> Vec<String> {
    let replies = reply.get("replies").and_then(|v| v.as_array());
    let mut synthetic = 0usize;

    let ids: Vec<String> = (0..expected)
        .map(|i| {
            replies
                .and_then(|r| r.get(i))
                .and_then(created_item_id)
                .unwrap_or_else(|| {
                    synthetic += 1;
                    format!("{}_{}", label, i)
                })
        })
        .collect();

    if synthetic > 0 {
        let shape = ApiError::UnexpectedReplyShape {
            label: label.to_string(),
            detail: format!("{}/{} 个条目缺少 itemId，已使用合成 ID", synthetic, expected),
        };
        warn!("⚠️ {}", shape);
    }
    ids
}

/// `createItem.itemId`，也接受 `createItem.item.itemId`
fn created_item_id(reply: &JsonValue) -> Option<String> {
    let created = reply.get("createItem")?;
    created
        .get("itemId")
        .or_else(|| created.get("item").and_then(|item| item.get("itemId")))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::mock::{transient, ScriptedApi};
    use super::*;
    use crate::models::{ConstituencyKey, DocumentItem, PositionedItem, SectionName};

    fn section(label_key: u32, start: usize) -> CompiledSection {
        let key = ConstituencyKey::new(label_key).unwrap();
        CompiledSection {
            name: SectionName::Constituency(key),
            items: vec![
                PositionedItem {
                    index: start,
                    item: DocumentItem::PageBreak,
                },
                PositionedItem {
                    index: start + 1,
                    item: DocumentItem::short_text("Agent ID".to_string()),
                },
            ],
        }
    }

    fn executor(api: ScriptedApi) -> MutationExecutor<ScriptedApi> {
        MutationExecutor::new(api, RetryPolicy::new(3, Duration::from_secs(2)))
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_back_off_then_fatal() {
        let api = ScriptedApi::with_replies(vec![Err(transient()), Err(transient()), Err(transient())]);
        let mut exec = executor(api);
        let err = exec.submit("form-1", &section(111, 5)).await.unwrap_err();

        match err {
            ApiError::Fatal { label, attempts, cause } => {
                assert_eq!(label, "constituency_111");
                assert_eq!(attempts, 3);
                assert!(cause.is_transient());
            }
            other => panic!("应为 Fatal: {:?}", other),
        }

        let calls = exec.api().batch_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        let waits: Vec<u64> = calls.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(waits, vec![2, 4]);
        assert!(!exec.is_completed("constituency_111"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_counts_first_call() {
        let api = ScriptedApi::with_replies(vec![Err(transient()), Err(transient()), Err(transient())]);
        let mut exec = MutationExecutor::new(api, RetryPolicy::default());
        let err = exec.submit("form-1", &section(112, 0)).await.unwrap_err();

        assert!(matches!(err, ApiError::Fatal { attempts: 3, .. }));
        assert_eq!(exec.api().call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_budget_never_retries() {
        let api = ScriptedApi::with_replies(vec![Err(transient())]);
        let mut exec = MutationExecutor::new(api, RetryPolicy::new(1, Duration::from_secs(2)));
        let started = tokio::time::Instant::now();
        let err = exec.submit("form-1", &section(112, 0)).await.unwrap_err();

        assert!(matches!(err, ApiError::Fatal { attempts: 1, .. }));
        assert_eq!(exec.api().call_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_remote_state_stops_resend() {
        let api = ScriptedApi {
            get_fails: true,
            ..ScriptedApi::with_replies(vec![Err(transient())])
        };
        let mut exec = executor(api);
        let err = exec.submit("form-1", &section(111, 5)).await.unwrap_err();

        match err {
            ApiError::Fatal { label, attempts, .. } => {
                assert_eq!(label, "constituency_111/reconcile");
                assert_eq!(attempts, 3);
            }
            other => panic!("应为 Fatal: {:?}", other),
        }
        // 只发出过第一次提交，查询失败后没有重发
        assert_eq!(exec.api().call_count(), 1);
        assert_eq!(*exec.api().get_calls.lock().unwrap(), 3);
        assert!(!exec.is_completed("constituency_111"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_is_fatal_without_waiting() {
        let api = ScriptedApi::with_replies(vec![Err(ApiError::from_status(
            "forms.batchUpdate",
            400,
            "Invalid request",
        ))]);
        let mut exec = executor(api);
        let started = tokio::time::Instant::now();
        let err = exec.submit("form-1", &section(111, 5)).await.unwrap_err();

        assert!(matches!(err, ApiError::Fatal { attempts: 1, .. }));
        assert_eq!(exec.api().call_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_one_transient_error() {
        let api = ScriptedApi::with_replies(vec![Err(transient())]);
        let mut exec = executor(api);
        let ids = exec.submit("form-1", &section(111, 5)).await.unwrap();
        assert_eq!(ids, vec!["id0", "id1"]);
        assert_eq!(exec.api().call_count(), 2);
        assert!(exec.is_completed("constituency_111"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_adopts_items_already_created() {
        let api = ScriptedApi::with_replies(vec![Err(transient())]);
        *api.form_state.lock().unwrap() = json!({
            "items": [
                { "itemId": "intro", "title": "Introduction" },
                { "itemId": "pb-remote" },
                { "itemId": "agent-remote", "title": "Agent ID" }
            ]
        });
        let mut exec = executor(api);
        let ids = exec.submit("form-1", &section(111, 1)).await.unwrap();
        assert_eq!(ids, vec!["pb-remote", "agent-remote"]);
        assert_eq!(exec.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_batch_is_rejected() {
        let mut exec = executor(ScriptedApi::default());
        exec.submit("form-1", &section(111, 5)).await.unwrap();
        let err = exec.submit("form-1", &section(111, 5)).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateBatch { .. }));
        assert_eq!(exec.api().call_count(), 1);
    }

    #[test]
    fn test_parse_ids_accepts_both_shapes() {
        let reply = json!({
            "replies": [
                { "createItem": { "itemId": "a" } },
                { "createItem": { "item": { "itemId": "b" } } }
            ]
        });
        assert_eq!(parse_created_ids(&reply, "basic_info", 2), vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_reply_gets_synthetic_ids() {
        let reply = json!({ "replies": [ { "createItem": { "itemId": "a" } }, {} ] });
        assert_eq!(
            parse_created_ids(&reply, "final_section", 3),
            vec!["a", "final_section_1", "final_section_2"]
        );
        assert_eq!(
            parse_created_ids(&JsonValue::Null, "introduction", 1),
            vec!["introduction_0"]
        );
    }

    #[tokio::test]
    async fn test_cleanup_reports_failure() {
        let exec = executor(ScriptedApi::default());
        assert!(exec.cleanup("form-1").await);
        assert_eq!(exec.api().deleted.lock().unwrap().as_slice(), &["form-1".to_string()]);

        let failing = executor(ScriptedApi {
            delete_fails: true,
            ..ScriptedApi::default()
        });
        assert!(!failing.cleanup("form-1").await);
    }

    #[tokio::test]
    async fn test_update_description_sends_update_mask() {
        let exec = executor(ScriptedApi::default());
        exec.update_description("form-1", "desc").await.unwrap();
        assert_eq!(exec.api().call_count(), 1);
    }
}
