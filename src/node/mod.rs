//! 决策节点层：救援节点与诊断提示词

pub mod prompt;
pub mod rescue;

pub use rescue::{BranchSignal, RescueInput, RescueNode, RescueOutcome};
