//! 救援节点：诊断失败的工具调用并携带诊断重试
//!
//! 入口一次性从 former_results 弹出 tool_call / tool_call_error 形成 Disposition，
//! 之后 诊断（LLM）→ 重试（ToolManager）→ 一次性写回短期记忆 → 返回分支信号。
//! 节点自身不做重试；LLM 的有界重试由 RetryingLlmClient 承担。

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RescueError;
use crate::llm::LlmClient;
use crate::memory::{keys, FormerResults, ShortTermMemory};
use crate::node::prompt;
use crate::observability::{ProgressEvent, ProgressSink};
use crate::task::{TaskStatus, TaskTree};
use crate::tools::{ToolCall, ToolManager};

/// 进度标签（本节点所有事件共用）
const PROGRESS_LABEL: &str = "Rescue";

/// 分支信号：告诉下游路由器走哪条出边
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSignal {
    /// 救援成功
    Success,
    /// 无可救援，或重试后仍失败
    Failed,
}

impl BranchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchSignal::Success => "success",
            BranchSignal::Failed => "failed",
        }
    }
}

/// 节点输入：序列化任务树 + 上游输出 + 透传参数
#[derive(Debug, Clone)]
pub struct RescueInput {
    pub agent_task: Value,
    pub last_output: Value,
    pub kwargs: Map<String, Value>,
}

impl RescueInput {
    pub fn new(agent_task: Value) -> Self {
        Self {
            agent_task,
            last_output: Value::Null,
            kwargs: Map::new(),
        }
    }

    pub fn with_last_output(mut self, last_output: Value) -> Self {
        self.last_output = last_output;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }
}

/// 节点输出：更新后的任务树、分支信号与透传值
#[derive(Debug, Clone, Serialize)]
pub struct RescueOutcome {
    pub agent_task: Value,
    pub switch_case_value: BranchSignal,
    pub last_output: Value,
    pub kwargs: Map<String, Value>,
}

/// 入口一次性判定：是否存在待救援的工具调用
#[derive(Debug)]
enum Disposition {
    /// former_results 中没有 tool_call，无事可做
    NoRescuePending,
    /// 有待救援调用（及可选的上次错误详情）
    RescuePending {
        tool_call: ToolCall,
        prior_error: Option<Value>,
    },
}

impl Disposition {
    /// 弹出 tool_call / tool_call_error，各消费一次；之后重跑同一映射退化为 NoRescuePending
    fn take(former_results: &mut FormerResults) -> Result<Self, serde_json::Error> {
        let Some(raw) = former_results.pop(keys::TOOL_CALL) else {
            return Ok(Self::NoRescuePending);
        };
        let tool_call: ToolCall = serde_json::from_value(raw)?;
        let prior_error = former_results.pop(keys::TOOL_CALL_ERROR);
        Ok(Self::RescuePending {
            tool_call,
            prior_error,
        })
    }
}

/// 救援节点：持有 LLM、ToolManager 与进度回调三个能力句柄
pub struct RescueNode {
    llm: Arc<dyn LlmClient>,
    tool_manager: Arc<dyn ToolManager>,
    callback: Arc<dyn ProgressSink>,
    /// 进度事件归属的工作流实例
    workflow_instance_id: String,
}

impl RescueNode {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tool_manager: Arc<dyn ToolManager>,
        callback: Arc<dyn ProgressSink>,
        workflow_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tool_manager,
            callback,
            workflow_instance_id: workflow_instance_id.into(),
        }
    }

    fn info(&self, message: &str) {
        self.callback.info(ProgressEvent::info(
            &self.workflow_instance_id,
            PROGRESS_LABEL,
            message,
        ));
    }

    /// 执行一次救援决策。
    ///
    /// 业务层结果（无可救援 / 重试仍失败）通过 BranchSignal 表达；
    /// LLM 或 ToolManager 自身失败作为 Err 向上传播，短期记忆不写回。
    pub async fn run(
        &self,
        stm: &mut ShortTermMemory,
        input: RescueInput,
    ) -> Result<RescueOutcome, RescueError> {
        let RescueInput {
            agent_task,
            last_output,
            kwargs,
        } = input;
        let mut task = TaskTree::from_value(agent_task)?;
        let mut former_results = stm.former_results();

        let (tool_call, prior_error) = match Disposition::take(&mut former_results)? {
            Disposition::NoRescuePending => {
                self.info("No tool call to rescue.");
                return Ok(RescueOutcome {
                    agent_task: task.to_value()?,
                    switch_case_value: BranchSignal::Failed,
                    last_output,
                    kwargs,
                });
            }
            Disposition::RescuePending {
                tool_call,
                prior_error,
            } => (tool_call, prior_error),
        };

        // 诊断：LLM 只拿到不可变快照（当前节点的任务描述 + 上次错误详情）
        let current = task.get_current_node();
        let failed_detail = render_error(prior_error.as_ref());
        let messages = prompt::build_messages(&current.task, failed_detail.as_deref());
        let diagnosis = self.llm.complete(&messages).await?;

        // 重试：上下文 = 弹出后的 former_results + failed_detail，整体交给 ToolManager
        let mut retry_context = former_results;
        retry_context.insert(keys::FAILED_DETAIL, Value::String(diagnosis));
        let execution = self
            .tool_manager
            .execute_task(&tool_call, &retry_context)
            .await?;

        if execution.is_success() {
            // 诊断已兑现，换成救援结果；任务状态不动，由下游节点定稿
            retry_context.pop(keys::FAILED_DETAIL);
            retry_context.insert(keys::RESCUE_DETAIL, execution.result);
            stm.set_former_results(retry_context);
            self.info("Rescue tool call success.");
            Ok(RescueOutcome {
                agent_task: task.to_value()?,
                switch_case_value: BranchSignal::Success,
                last_output,
                kwargs,
            })
        } else {
            // failed_detail 留在上下文里供下游排障；当前节点重新置为 Running 交回引擎迭代
            stm.set_former_results(retry_context);
            task.set_current_status(TaskStatus::Running);
            self.info("Rescue tool call failed.");
            Ok(RescueOutcome {
                agent_task: task.to_value()?,
                switch_case_value: BranchSignal::Failed,
                last_output,
                kwargs,
            })
        }
    }
}

/// 错误详情渲染：字符串取原文，其它 JSON 原样序列化
fn render_error(value: Option<&Value>) -> Option<String> {
    value.map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
