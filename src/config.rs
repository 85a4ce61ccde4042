//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SALVAGE__*` 覆盖（双下划线表示嵌套，如 `SALVAGE__LLM__PROVIDER=mock`）。

use std::path::Path;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [llm] 段：后端选择、模型与重试策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock
    pub provider: String,
    pub model: String,
    /// OpenAI 兼容端点，未设置时用官方地址
    pub base_url: Option<String>,
    /// 诊断调用的最大尝试次数（由 RetryingLlmClient 承担，节点本身不重试）
    pub max_attempts: u32,
    /// 重试退避基数（毫秒），按尝试次数线性放大
    pub retry_backoff_ms: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// [tools] 段：工具执行超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具执行超时（秒）
    pub timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    /// 加载配置：config/default.toml（可缺省）+ SALVAGE__ 环境变量覆盖
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config/default.toml")
    }

    /// 从指定 TOML 文件加载（文件可不存在，此时全部取默认值 / 环境变量）
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("SALVAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        settings.try_deserialize()
    }
}
