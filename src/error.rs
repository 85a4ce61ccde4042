//! 顶层错误类型
//!
//! 业务层失败（工具重试后仍不成功）不走错误通道，而是作为分支信号返回；
//! 这里只承载基础设施失败：LLM 后端 / ToolManager 自身出错、负载反序列化失败。
//! 此类错误向上抛给调度器，由它决定整个任务失败还是重调本节点。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolManagerError;

/// 救援节点运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum RescueError {
    /// LLM 后端在自身重试预算耗尽后仍然失败
    #[error("LLM backend failed: {0}")]
    Llm(#[from] LlmError),

    /// ToolManager 自身无法响应（区别于工具返回失败状态）
    #[error("Tool manager failed: {0}")]
    ToolManager(#[from] ToolManagerError),

    /// agent_task / tool_call 等负载不是预期的序列化形式
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}
