//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的整体调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 加载设置、题目文本和 Excel 数据
//! - 创建表单 API 客户端
//! - 保存元数据、输出最终摘要
//!
//! ### `form_processor` - 表单生成器
//! - 收集选区、提取选项、编译文档
//! - 创建表单并按顺序提交每个分区
//! - 失败时尝试删除未完成的表单
//!
//! ## 层次关系
//!
//! ```text
//! app (加载资源，持有 FormsClient)
//!     ↓
//! form_processor (处理 Vec<CompiledSection>)
//!     ↓
//! workflow::SectionFlow (处理单个分区)
//!     ↓
//! services (能力层：resolve / extract / compile / submit)
//!     ↓
//! infrastructure (基础设施：TabularSource、FormsClient)
//! ```
//!
//! ## 设计原则
//!
//! 1. **严格顺序**：分区按顺序提交，后一个分区的位置依赖前一个分区
//! 2. **资源隔离**：只有编排层创建表单 API 客户端
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **失败可见**：中止时报告失败的阶段，清理失败要求人工处理

pub mod app;
pub mod form_processor;

// 重新导出主要类型
pub use app::{save_metadata, App};
pub use form_processor::{select_targets, BuildOutcome, FormBuilder};
