//! 进程级事件输出端

use crate::event::{LogEvent, LogLine};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// 守护进程的固定来源标识
pub const DEFAULT_SOURCE: &str = "vx-mark-scan-pat-daemon";

/// 固定用户角色（无人值守守护进程）
pub const SYSTEM_USER: &str = "system";

/// 审计日志输出端
///
/// 每个事件序列化为一行 JSON 写入底层 writer。writer 由互斥锁保护，
/// 多个 clone 同时输出时每一行仍是完整的。
///
/// 日志只追加、按输出时间排序，除底层流本身外不做额外缓冲。
#[derive(Clone)]
pub struct LogSink {
    source: Arc<str>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogSink {
    /// 输出到 stdout 的默认 sink
    pub fn stdout() -> Self {
        Self::new(DEFAULT_SOURCE, io::stdout())
    }

    /// 使用任意 writer 构造 sink
    pub fn new(source: impl Into<Arc<str>>, writer: impl Write + Send + 'static) -> Self {
        Self {
            source: source.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 输出一个事件
    ///
    /// 写入失败不会向调用方传播（日志流断开时守护进程仍需继续工作），
    /// 只通过 `tracing` 报告到 stderr。
    pub fn emit(&self, event: LogEvent) {
        let line = LogLine {
            event_id: event.event_id(),
            source: self.source.to_string(),
            event_type: event.event_type(),
            user: SYSTEM_USER.to_string(),
            message: event.message_text().to_string(),
            operation: event.operation().to_string(),
            disposition: event.disposition(),
        };

        let mut writer = self.writer.lock();
        if let Err(e) = write_line(&mut *writer, &line) {
            tracing::warn!("Failed to write audit log line {:?}: {}", line.event_id, e);
        }
    }

    /// 构造一个写入内存的 sink，并返回用于读取已输出事件的句柄
    #[cfg(any(test, feature = "mock"))]
    pub fn capture() -> (Self, LogCapture) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Self::new(DEFAULT_SOURCE, SharedBuffer(buffer.clone()));
        (sink, LogCapture { buffer })
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").field("source", &self.source).finish_non_exhaustive()
    }
}

fn write_line(writer: &mut dyn Write, line: &LogLine) -> io::Result<()> {
    let mut buf = serde_json::to_vec(line).map_err(io::Error::other)?;
    buf.push(b'\n');
    // 单次 write_all：一行要么完整写出，要么报错
    writer.write_all(&buf)?;
    writer.flush()
}

#[cfg(any(test, feature = "mock"))]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(any(test, feature = "mock"))]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 内存 sink 的读取句柄
#[cfg(any(test, feature = "mock"))]
#[derive(Clone)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[cfg(any(test, feature = "mock"))]
impl LogCapture {
    /// 已输出的原始文本
    pub fn raw(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// 按输出顺序解析出的全部日志行
    pub fn lines(&self) -> Vec<LogLine> {
        self.raw()
            .lines()
            .map(|l| serde_json::from_str(l).expect("captured line is valid JSON"))
            .collect()
    }

    pub fn event_ids(&self) -> Vec<crate::EventId> {
        self.lines().into_iter().map(|l| l.event_id).collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Disposition, EventId, EventType};

    #[test]
    fn test_emit_fixed_keys() {
        let (sink, capture) = LogSink::capture();
        sink.emit(
            LogEvent::action(EventId::ConnectToGpioPinComplete, "export")
                .with_disposition(Disposition::Success)
                .message("Exported GPIO pin 478"),
        );

        let raw = capture.raw();
        assert!(raw.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(raw.trim_end()).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["disposition", "eventId", "eventType", "message", "operation", "source", "user"]
        );
        assert_eq!(obj["eventId"], "connect-to-gpio-pin-complete");
        assert_eq!(obj["source"], DEFAULT_SOURCE);
        assert_eq!(obj["eventType"], "action");
        assert_eq!(obj["user"], "system");
        assert_eq!(obj["message"], "Exported GPIO pin 478");
        assert_eq!(obj["operation"], "export");
        assert_eq!(obj["disposition"], "success");
    }

    #[test]
    fn test_emit_preserves_order() {
        let (sink, capture) = LogSink::capture();
        sink.emit(LogEvent::action(EventId::ProcessStarted, "main"));
        sink.clone().emit(LogEvent::status(EventId::Info, "main").message("hello"));
        sink.emit(LogEvent::action(EventId::ProcessTerminated, "main"));

        let lines = capture.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].event_id, EventId::ProcessStarted);
        assert_eq!(lines[1].event_type, EventType::Status);
        assert_eq!(lines[1].message, "hello");
        assert_eq!(lines[2].event_id, EventId::ProcessTerminated);
        assert_eq!(lines[2].disposition, Disposition::Na);
    }

    #[test]
    fn test_default_message_falls_back_to_description() {
        let (sink, capture) = LogSink::capture();
        sink.emit(LogEvent::action(EventId::UnexportGpioPinInit, "unexport"));
        assert_eq!(capture.lines()[0].message, "Unexporting GPIO pin.");
    }

    #[test]
    fn test_concurrent_emit_lines_stay_whole() {
        let (sink, capture) = LogSink::capture();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        sink.emit(LogEvent::status(EventId::Info, format!("thread-{}", i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 每一行都能独立解析即说明没有交错
        assert_eq!(capture.lines().len(), 200);
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let sink = LogSink::new(DEFAULT_SOURCE, BrokenWriter);
        sink.emit(LogEvent::action(EventId::ProcessStarted, "main"));
    }
}
