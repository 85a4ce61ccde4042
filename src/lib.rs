//! Salvage - 任务救援节点
//!
//! 任务图中某个工具调用失败后，本节点用 LLM 诊断失败原因，携带诊断重试该工具，
//! 并通过分支信号（success / failed）把任务路由到下游路由器的两条出边之一。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 顶层错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）+ 有界重试
//! - **memory**: 任务执行期短期记忆（former_results 映射）
//! - **node**: RescueNode 决策节点与诊断提示词
//! - **observability**: tracing 初始化与进度事件
//! - **task**: 任务树、任务节点与状态
//! - **tools**: 工具注册表与 ToolManager

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod node;
pub mod observability;
pub mod task;
pub mod tools;

pub use error::RescueError;
pub use node::{BranchSignal, RescueInput, RescueNode, RescueOutcome};
