//! 可观测性：tracing 初始化与进度事件

pub mod progress;

pub use progress::{ProgressEvent, ProgressSink, TracingSink};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}
