//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）+ 有界重试

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{
    LlmClient, LlmError, Message, RetryConfig, RetryingLlmClient, Role, TokenStream,
};

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

/// 按配置创建 LLM 客户端（openai / mock），并套上有界重试包装
pub fn create_llm_client(config: &AppConfig) -> Arc<dyn LlmClient> {
    let inner: Arc<dyn LlmClient> = match config.llm.provider.as_str() {
        "mock" => Arc::new(MockLlmClient::new()),
        _ => Arc::new(OpenAiClient::new(
            config.llm.base_url.as_deref(),
            &config.llm.model,
            None,
        )),
    };
    let retry = RetryConfig {
        max_attempts: config.llm.max_attempts,
        backoff: Duration::from_millis(config.llm.retry_backoff_ms),
    };
    Arc::new(RetryingLlmClient::new(inner, retry))
}
