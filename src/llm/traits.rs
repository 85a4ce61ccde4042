//! LLM 客户端抽象
//!
//! 后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（非流式）、complete_stream（流式 Token）。
//! 有界重试由 RetryingLlmClient 承担；调用方（救援节点）自身不做重试。

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// LLM 层错误
#[derive(Error, Debug)]
pub enum LlmError {
    /// 单次后端调用失败（网络 / API 错误）
    #[error("backend error: {0}")]
    Backend(String),

    /// 重试预算耗尽后仍失败
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// 响应中没有任何 choice / content
    #[error("empty completion")]
    EmptyCompletion,
}

/// 流式完成返回的 Token 流
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// LLM 客户端 trait：非流式完成与流式完成（返回 Token 流）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条 choice 的 content
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 流式完成；默认退化为一次性返回完整内容
    async fn complete_stream(&self, messages: &[Message]) -> Result<TokenStream, LlmError> {
        let content = self.complete(messages).await?;
        Ok(Box::pin(futures_util::stream::iter(vec![Ok(content)])))
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试策略：最大尝试次数 + 线性退避
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// 退避基数，第 n 次失败后等待 n * backoff
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// 有界重试包装：预算耗尽后转 RetriesExhausted 向上抛
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last = String::new();
        for attempt in 1..=attempts {
            match self.inner.complete(messages).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    last = e.to_string();
                    tracing::warn!(attempt, max = attempts, error = %last, "LLM call failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.backoff * attempt).await;
                    }
                }
            }
        }
        Err(LlmError::RetriesExhausted { attempts, last })
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
