//! 记忆层：任务执行期短期记忆
//!
//! 工作流引擎为每次任务执行准备一份 ShortTermMemory，各节点在其中读写
//! former_results 槽位（本次尝试累计的执行上下文）。

pub mod short_term;

pub use short_term::{keys, FormerResults, ShortTermMemory};
