//! 进度事件：节点的每个终止分支恰好上报一条 info 事件
//!
//! 对应工作流引擎的回调通道，fire-and-forget：上报失败不影响节点返回值。
//! 默认实现 TracingSink 写 tracing 日志；测试中可用收集器断言事件条数与内容。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单条进度事件（可序列化为 JSON 供前端 / 审计使用）
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// 所属工作流实例
    pub agent_id: String,
    /// 进度标签（救援节点固定为 "Rescue"）
    pub progress: String,
    /// 人类可读消息
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn info(
        agent_id: impl Into<String>,
        progress: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            progress: progress.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 进度接收端
pub trait ProgressSink: Send + Sync {
    fn info(&self, event: ProgressEvent);
}

/// 默认实现：写 tracing 日志
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn info(&self, event: ProgressEvent) {
        tracing::info!(
            agent_id = %event.agent_id,
            progress = %event.progress,
            "{}",
            event.message
        );
    }
}
