//! 短期记忆：按 key 存放 JSON 槽位；former_results 为其中的约定槽位
//!
//! 单写者假设：引擎保证同一任务的键空间同时只有一个节点在写。
//! 节点取出副本、本地修改、在工具调用落定后一次性写回（中途失败不留半写状态）。

use std::collections::HashMap;

use serde_json::{Map, Value};

/// former_results 中本节点关心的键名
pub mod keys {
    /// ShortTermMemory 中 former_results 槽位名
    pub const FORMER_RESULTS: &str = "former_results";
    /// 待救援的工具调用描述符（存在则进入救援分支，取出即消费）
    pub const TOOL_CALL: &str = "tool_call";
    /// 上一次工具调用的错误详情（可缺省）
    pub const TOOL_CALL_ERROR: &str = "tool_call_error";
    /// LLM 诊断文本（瞬态：救援成功后移除）
    pub const FAILED_DETAIL: &str = "failed_detail";
    /// 救援成功后的工具结果负载
    pub const RESCUE_DETAIL: &str = "rescue_detail";
}

/// 本次任务尝试累计的执行上下文（字符串键 -> 任意 JSON 值）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormerResults(Map<String, Value>);

impl FormerResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从槽位值解析；非对象按空映射处理
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// 取出并移除（等价于带缺省的 pop：键不存在时返回 None）
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 短期记忆：每次任务执行一份，节点间通过槽位传递上下文
#[derive(Debug, Clone, Default)]
pub struct ShortTermMemory {
    slots: HashMap<String, Value>,
}

impl ShortTermMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.slots.insert(key.into(), value);
    }

    /// 取出 former_results 槽位的副本（槽位缺省时为空映射）
    pub fn former_results(&self) -> FormerResults {
        self.slots
            .get(keys::FORMER_RESULTS)
            .cloned()
            .map(FormerResults::from_value)
            .unwrap_or_default()
    }

    /// 整体替换 former_results 槽位
    pub fn set_former_results(&mut self, results: FormerResults) {
        self.slots
            .insert(keys::FORMER_RESULTS.to_string(), results.into_value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pop_consumes_key() {
        let mut results = FormerResults::from_value(json!({"tool_call": {"tool_name": "echo"}}));
        assert!(results.pop(keys::TOOL_CALL).is_some());
        assert!(results.pop(keys::TOOL_CALL).is_none());
        assert!(results.is_empty());
    }

    #[test]
    fn test_from_value_non_object_is_empty() {
        let results = FormerResults::from_value(json!("not a map"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_stm_former_results_roundtrip() {
        let mut stm = ShortTermMemory::new();
        assert!(stm.former_results().is_empty());

        let mut results = FormerResults::new();
        results.insert(keys::RESCUE_DETAIL, json!({"value": 42}));
        stm.set_former_results(results.clone());

        assert_eq!(stm.former_results(), results);
        assert_eq!(
            stm.get(keys::FORMER_RESULTS),
            Some(&json!({"rescue_detail": {"value": 42}}))
        );
    }
}
