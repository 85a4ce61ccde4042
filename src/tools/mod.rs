//! 工具层：Tool trait、注册表与 ToolManager

pub mod echo;
pub mod manager;
pub mod registry;

pub use echo::EchoTool;
pub use manager::{
    ExecutionStatus, RegistryToolManager, ToolCall, ToolExecution, ToolManager, ToolManagerError,
};
pub use registry::{Tool, ToolRegistry};
