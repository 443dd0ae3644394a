//! # Survey Form Builder
//!
//! 把多张选区数据表编译为一份多分区问卷，并通过远程表单 API 逐批创建
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `TabularSource` / `SourceSet` - Excel 工作表的只读视图
//! - `FormsClient` - 表单 API 的 HTTP 实现（创建 / 批量更新 / 查询 / 删除）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `KeyResolver` - 校验并汇总选区编号
//! - `OptionExtractor` - 按类别提取去重后的选项，保证非空
//! - `DocumentCompiler` - 编译带连续位置索引的条目序列
//! - `MutationExecutor` - 批量提交，带指数退避重试
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个分区"的提交流程
//! - `SectionCtx` - 上下文封装（form_id + 分区序号）
//! - `SectionFlow` - 校验位置 → 提交 → 记录条目 ID
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 加载资源、保存元数据
//! - `orchestrator/form_processor` - 一次完整的问卷生成
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, Settings};
pub use error::{AppError, AppResult};
pub use infrastructure::{FormsApi, FormsClient, SourceSet, TabularSource};
pub use models::{ConstituencyKey, FormMetadata, OptionCategory, OptionList};
pub use orchestrator::{App, FormBuilder};
pub use workflow::{SectionCtx, SectionFlow};
