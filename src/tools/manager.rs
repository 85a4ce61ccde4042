//! ToolManager：执行工具调用描述符并返回执行状态
//!
//! 业务失败（工具返回 Err / 超时）表达为 ExecutionStatus::Failed，由救援节点转成分支信号；
//! 基础设施失败（未注册的工具名）走 ToolManagerError 向上传播。
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::time::timeout;

use crate::memory::FormerResults;
use crate::tools::ToolRegistry;

/// 工具调用描述符：调用哪个工具、带什么参数（对救援节点不透明，原样传递）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// 工具执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// 一次工具执行的结果：状态 + 任意负载（失败时为错误详情）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub status: ExecutionStatus,
    pub result: Value,
}

impl ToolExecution {
    pub fn success(result: Value) -> Self {
        Self {
            status: ExecutionStatus::Success,
            result,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            result: Value::String(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// ToolManager 层错误（基础设施失败，区别于工具业务失败）
#[derive(Error, Debug)]
pub enum ToolManagerError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// ToolManager trait：给定描述符与上下文映射执行工具
#[async_trait]
pub trait ToolManager: Send + Sync {
    async fn execute_task(
        &self,
        tool_call: &ToolCall,
        related_info: &FormerResults,
    ) -> Result<ToolExecution, ToolManagerError>;
}

/// 基于注册表的 ToolManager：对每次调用施加超时，输出 JSON 审计日志
pub struct RegistryToolManager {
    registry: ToolRegistry,
    timeout: Duration,
}

impl RegistryToolManager {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 将上下文映射并入工具参数：原参数保持不变，另挂 related_info 键，
    /// 工具可读取其中的 failed_detail 调整执行（如修正参数）
    fn merge_args(tool_call: &ToolCall, related_info: &FormerResults) -> Value {
        let mut args = match &tool_call.arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other.clone());
                map
            }
        };
        args.insert(
            "related_info".to_string(),
            related_info.clone().into_value(),
        );
        Value::Object(args)
    }
}

#[async_trait]
impl ToolManager for RegistryToolManager {
    async fn execute_task(
        &self,
        tool_call: &ToolCall,
        related_info: &FormerResults,
    ) -> Result<ToolExecution, ToolManagerError> {
        let tool = self
            .registry
            .get(&tool_call.tool_name)
            .ok_or_else(|| ToolManagerError::UnknownTool(tool_call.tool_name.clone()))?;

        let args = Self::merge_args(tool_call, related_info);
        let execution_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (outcome, execution) = match result {
            Ok(Ok(payload)) => ("ok", ToolExecution::success(payload)),
            Ok(Err(e)) => ("error", ToolExecution::failed(e)),
            Err(_) => (
                "timeout",
                ToolExecution::failed(format!("Tool timeout: {}", tool_call.tool_name)),
            ),
        };

        let audit = json!({
            "event": "tool_audit",
            "execution_id": execution_id,
            "tool": tool_call.tool_name,
            "ok": execution.is_success(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        Ok(execution)
    }
}
