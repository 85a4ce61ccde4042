//! 救援诊断提示词
//!
//! 两段式：固定 system 指令 + 按（当前节点任务描述、失败详情）填充的 user 消息。

use crate::llm::Message;

/// system 指令：要求 LLM 分析失败原因并给出修正建议
pub const SYS_PROMPT: &str = "You are a troubleshooting assistant inside a task execution \
engine. A tool invocation for the current task has failed. Analyze the failure, explain the \
most likely cause, and suggest how the tool call should be adjusted (for example corrected \
arguments) so that a retry can succeed. Reply with a concise diagnosis.";

/// 组装两段式诊断消息（task = 当前节点任务描述，failed_detail = 上次错误详情）
pub fn build_messages(task: &str, failed_detail: Option<&str>) -> Vec<Message> {
    let user = format!(
        "Task: {}\nFailed detail: {}",
        task,
        failed_detail.unwrap_or("None")
    );
    vec![Message::system(SYS_PROMPT), Message::user(user)]
}
