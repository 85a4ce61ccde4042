//! 任务层：任务树、任务节点与状态

pub mod tree;

pub use tree::{TaskNode, TaskStatus, TaskTree};
