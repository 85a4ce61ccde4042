//! 救援节点集成测试
//!
//! 用脚本化 LLM / ToolManager / 进度收集器端到端驱动 RescueNode，
//! 覆盖三个终止分支、一次性消费语义与多层任务树。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use salvage::llm::{LlmClient, LlmError, Message, Role};
use salvage::memory::{keys, FormerResults, ShortTermMemory};
use salvage::observability::{ProgressEvent, ProgressSink};
use salvage::task::{TaskNode, TaskStatus, TaskTree};
use salvage::tools::{ToolCall, ToolExecution, ToolManager, ToolManagerError};
use salvage::{BranchSignal, RescueError, RescueInput, RescueNode};

/// 固定返回一条诊断文本，并记录收到的消息
struct RecordingLlm {
    diagnosis: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<Message>>,
    fail: bool,
}

impl RecordingLlm {
    fn new(diagnosis: &str) -> Self {
        Self {
            diagnosis: diagnosis.to_string(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    fn user_prompt(&self) -> String {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|m| matches!(m.role, Role::User))
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().extend_from_slice(messages);
        if self.fail {
            return Err(LlmError::RetriesExhausted {
                attempts: 3,
                last: "backend down".to_string(),
            });
        }
        Ok(self.diagnosis.clone())
    }
}

/// 按脚本返回执行结果，并记录收到的描述符与上下文
struct ScriptedToolManager {
    execution: Result<ToolExecution, ToolManagerError>,
    calls: AtomicUsize,
    seen_call: Mutex<Option<ToolCall>>,
    seen_info: Mutex<Option<FormerResults>>,
}

impl ScriptedToolManager {
    fn returning(execution: ToolExecution) -> Self {
        Self {
            execution: Ok(execution),
            calls: AtomicUsize::new(0),
            seen_call: Mutex::new(None),
            seen_info: Mutex::new(None),
        }
    }

    fn erring(err: ToolManagerError) -> Self {
        Self {
            execution: Err(err),
            calls: AtomicUsize::new(0),
            seen_call: Mutex::new(None),
            seen_info: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ToolManager for ScriptedToolManager {
    async fn execute_task(
        &self,
        tool_call: &ToolCall,
        related_info: &FormerResults,
    ) -> Result<ToolExecution, ToolManagerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_call.lock().unwrap() = Some(tool_call.clone());
        *self.seen_info.lock().unwrap() = Some(related_info.clone());
        match &self.execution {
            Ok(execution) => Ok(execution.clone()),
            Err(ToolManagerError::UnknownTool(name)) => {
                Err(ToolManagerError::UnknownTool(name.clone()))
            }
        }
    }
}

/// 收集进度事件供断言
#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for CollectingSink {
    fn info(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl CollectingSink {
    fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

fn sample_tree() -> TaskTree {
    let root = TaskNode::new("t0", "root task")
        .with_status(TaskStatus::Running)
        .with_children(vec![
            TaskNode::new("t1", "fetch the quarterly report"),
            TaskNode::new("t2", "summarize findings"),
        ]);
    TaskTree::new(root).with_cursor("t1")
}

fn stm_with_pending_call() -> ShortTermMemory {
    let mut stm = ShortTermMemory::new();
    stm.set(
        keys::FORMER_RESULTS,
        json!({
            "tool_call": {"tool_name": "web_fetch", "arguments": {"url": "http://x"}},
            "tool_call_error": "timeout",
        }),
    );
    stm
}

fn node_with(
    llm: Arc<RecordingLlm>,
    tools: Arc<ScriptedToolManager>,
    sink: Arc<CollectingSink>,
) -> RescueNode {
    RescueNode::new(llm, tools, sink, "wf-1")
}

#[tokio::test]
async fn test_rescue_success_branch() {
    let llm = Arc::new(RecordingLlm::new("the url lacks a scheme, add https"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        json!({"value": 42}),
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    let input = RescueInput::new(sample_tree().to_value().unwrap())
        .with_last_output(json!("previous output"));
    let outcome = node.run(&mut stm, input).await.unwrap();

    assert_eq!(outcome.switch_case_value, BranchSignal::Success);
    assert_eq!(outcome.switch_case_value.as_str(), "success");
    assert_eq!(outcome.last_output, json!("previous output"));

    // 任务状态未被触碰（定稿交给下游节点）
    let task = TaskTree::from_value(outcome.agent_task).unwrap();
    assert_eq!(task.get_current_node().status, TaskStatus::Waiting);

    // 持久化的 former_results：tool_call / tool_call_error / failed_detail 均被消费
    let results = stm.former_results();
    assert!(!results.contains(keys::TOOL_CALL));
    assert!(!results.contains(keys::TOOL_CALL_ERROR));
    assert!(!results.contains(keys::FAILED_DETAIL));
    assert_eq!(results.get(keys::RESCUE_DETAIL), Some(&json!({"value": 42})));

    // ToolManager 收到的上下文里带着诊断
    let seen = tools.seen_info.lock().unwrap().clone().unwrap();
    assert_eq!(
        seen.get(keys::FAILED_DETAIL),
        Some(&json!("the url lacks a scheme, add https"))
    );
    let seen_call = tools.seen_call.lock().unwrap().clone().unwrap();
    assert_eq!(seen_call.tool_name, "web_fetch");

    // 恰好一条进度事件
    assert_eq!(sink.messages(), vec!["Rescue tool call success.".to_string()]);
}

#[tokio::test]
async fn test_rescue_failed_branch_rearms_task() {
    let llm = Arc::new(RecordingLlm::new("diagnosis text"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::failed(
        "bad args",
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    let outcome = node
        .run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap();

    assert_eq!(outcome.switch_case_value, BranchSignal::Failed);

    // 当前节点（t1，不是根）被重新置为 running
    let task = TaskTree::from_value(outcome.agent_task).unwrap();
    assert_eq!(task.get_current_node().id, "t1");
    assert_eq!(task.get_current_node().status, TaskStatus::Running);
    assert_eq!(task.root.children[1].status, TaskStatus::Waiting);

    // failed_detail 留在持久化的 former_results 中，等于 LLM 诊断
    let results = stm.former_results();
    assert_eq!(results.get(keys::FAILED_DETAIL), Some(&json!("diagnosis text")));
    assert!(!results.contains(keys::RESCUE_DETAIL));
    assert!(!results.contains(keys::TOOL_CALL));

    assert_eq!(sink.messages(), vec!["Rescue tool call failed.".to_string()]);
}

#[tokio::test]
async fn test_no_pending_rescue_branch() {
    let llm = Arc::new(RecordingLlm::new("unused"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        Value::Null,
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = ShortTermMemory::new();
    let tree_value = sample_tree().to_value().unwrap();
    let outcome = node
        .run(&mut stm, RescueInput::new(tree_value.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.switch_case_value, BranchSignal::Failed);
    // 任务原样返回，未调用 LLM 或 ToolManager
    assert_eq!(outcome.agent_task, tree_value);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    assert_eq!(tools.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.messages(), vec!["No tool call to rescue.".to_string()]);
}

#[tokio::test]
async fn test_consumption_is_idempotent() {
    let llm = Arc::new(RecordingLlm::new("diag"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        json!({"ok": true}),
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    let first = node
        .run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap();
    assert_eq!(first.switch_case_value, BranchSignal::Success);

    // 不重新填充 tool_call，第二次调度退化为无可救援分支
    let second = node
        .run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap();
    assert_eq!(second.switch_case_value, BranchSignal::Failed);
    assert_eq!(tools.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        sink.messages(),
        vec![
            "Rescue tool call success.".to_string(),
            "No tool call to rescue.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_llm_sees_current_node_not_root() {
    let llm = Arc::new(RecordingLlm::new("diag"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        Value::Null,
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    node.run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap();

    let prompt = llm.user_prompt();
    assert!(prompt.contains("fetch the quarterly report"));
    assert!(!prompt.contains("root task"));
    assert!(prompt.contains("timeout"));
}

#[tokio::test]
async fn test_llm_failure_propagates_without_persisting() {
    let llm = Arc::new(RecordingLlm::failing());
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        Value::Null,
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    let err = node
        .run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, RescueError::Llm(_)));

    // 短期记忆未写回：tool_call 仍在，且没有任何进度事件
    assert!(stm.former_results().contains(keys::TOOL_CALL));
    assert_eq!(tools.calls.load(Ordering::SeqCst), 0);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_tool_manager_failure_propagates() {
    let llm = Arc::new(RecordingLlm::new("diag"));
    let tools = Arc::new(ScriptedToolManager::erring(ToolManagerError::UnknownTool(
        "web_fetch".to_string(),
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm.clone(), tools.clone(), sink.clone());

    let mut stm = stm_with_pending_call();
    let err = node
        .run(&mut stm, RescueInput::new(sample_tree().to_value().unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, RescueError::ToolManager(_)));
    assert!(stm.former_results().contains(keys::TOOL_CALL));
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_kwargs_pass_through_unchanged() {
    let llm = Arc::new(RecordingLlm::new("diag"));
    let tools = Arc::new(ScriptedToolManager::returning(ToolExecution::success(
        Value::Null,
    )));
    let sink = Arc::new(CollectingSink::default());
    let node = node_with(llm, tools, sink);

    let mut kwargs = serde_json::Map::new();
    kwargs.insert("retry_round".to_string(), json!(2));

    let mut stm = stm_with_pending_call();
    let outcome = node
        .run(
            &mut stm,
            RescueInput::new(sample_tree().to_value().unwrap())
                .with_kwargs(kwargs.clone())
                .with_last_output(json!([1, 2, 3])),
        )
        .await
        .unwrap();

    assert_eq!(outcome.kwargs, kwargs);
    assert_eq!(outcome.last_output, json!([1, 2, 3]));
}
