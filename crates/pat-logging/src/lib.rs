//! # PAT Audit Logging
//!
//! 守护进程的审计日志层：每个硬件动作/状态点都以一行 JSON 输出到 stdout。
//!
//! - [`LogEvent`]: 不可变事件记录（event id、类型、消息、操作名、处置结果）
//! - [`LogSink`]: 进程级事件输出端，可廉价 clone，按输出顺序追加
//!
//! 开发者诊断信息不走这里，而是使用 `tracing`（输出到 stderr），
//! 两条流不会互相穿插。
//!
//! # 示例
//!
//! ```no_run
//! use pat_logging::{Disposition, EventId, LogEvent, LogSink};
//!
//! let sink = LogSink::stdout();
//! sink.emit(
//!     LogEvent::action(EventId::ConnectToGpioPinComplete, "export")
//!         .with_disposition(Disposition::Success)
//!         .message("Exported GPIO pin 478"),
//! );
//! ```

mod event;
mod sink;

pub use event::{Disposition, EventId, EventType, LogEvent, LogLine};
pub use sink::{DEFAULT_SOURCE, LogSink, SYSTEM_USER};

#[cfg(any(test, feature = "mock"))]
pub use sink::LogCapture;
