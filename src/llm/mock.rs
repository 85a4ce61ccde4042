//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 无脚本时回显最后一条 User 消息作为「诊断」；也可用脚本队列依次返回
//! 成功 / 失败，覆盖重试与失败传播路径。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端：脚本队列优先，否则回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, String>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序消费给定的响应（Err 转为 LlmError::Backend）
    pub fn scripted(responses: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let next = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };
        if let Some(response) = next {
            return response.map_err(LlmError::Backend);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Diagnosis: {}", last_user))
    }
}
