//! 任务树：层级任务结构与状态
//!
//! 工作流引擎以序列化形式（JSON）在节点间传递任务树。救援节点只读取
//! 当前节点（cursor 指向的节点，不一定是根）的任务描述，并在救援失败时
//! 把当前节点状态改回 Running，交回引擎继续迭代。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待执行
    Waiting,
    /// 正在执行（救援失败时重新置为此态）
    Running,
    /// 已成功
    Success,
    /// 已失败
    Failed,
}

/// 任务树节点：任务描述 + 状态 + 子任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    /// 任务描述 / 目标文本
    pub task: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    pub fn new(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            status: TaskStatus::Waiting,
            children: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_children(mut self, children: Vec<TaskNode>) -> Self {
        self.children = children;
        self
    }

    /// 深度优先查找
    fn find(&self, id: &str) -> Option<&TaskNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut TaskNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

/// 任务树：根节点 + 当前执行位置（cursor）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTree {
    pub root: TaskNode,
    /// 当前正在执行的节点 id（不一定是根）
    pub cursor: String,
}

impl TaskTree {
    pub fn new(root: TaskNode) -> Self {
        let cursor = root.id.clone();
        Self { root, cursor }
    }

    /// 指定当前执行位置
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    /// 从序列化形式恢复（引擎传入的 agent_task）
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// 当前执行节点；cursor 悬空时退回根节点
    pub fn get_current_node(&self) -> &TaskNode {
        self.root.find(&self.cursor).unwrap_or(&self.root)
    }

    /// 设置当前执行节点的状态；cursor 悬空时作用于根节点
    pub fn set_current_status(&mut self, status: TaskStatus) {
        let target = if self.root.find(&self.cursor).is_some() {
            self.cursor.clone()
        } else {
            self.root.id.clone()
        };
        if let Some(node) = self.root.find_mut(&target) {
            node.status = status;
        }
    }
}
