//! PAT 输入守护进程主入口
//!
//! 轮询 PAT 开关的 GPIO 线，把每次开关动作转换为虚拟键盘上的一次按键。
//! 审计日志（JSON 行）写到 stdout，诊断日志（tracing）写到 stderr。

mod config;
mod error;
mod poller;
mod shutdown;
mod signal_state;
mod singleton;
mod status_file;

use clap::Parser;
use config::PatConfig;
use error::DaemonError;
use pat_logging::{Disposition, EventId, LogEvent, LogSink};
use pat_uinput::UinputKeyboard;
use poller::SignalPoller;
use shutdown::ShutdownFlag;
use singleton::SingletonLock;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

/// PAT 输入守护进程
///
/// 引脚号与轮询间隔是固定常量，命令行只提供运行开关。
#[derive(Parser, Debug)]
#[command(name = "pat-input-daemon")]
#[command(about = "PAT Input Daemon - Turns PAT switch activations into keypresses", long_about = None)]
struct Args {
    /// 没有 GPIO export 控制文件时（开发机）空转等待关闭，而不是失败退出
    #[arg(long)]
    skip_hardware_check: bool,

    /// mark-scan 工作目录，连接状态文件写在此处
    #[arg(long, env = "MARK_SCAN_WORKSPACE")]
    mark_scan_workspace: Option<PathBuf>,

    /// 锁文件路径
    ///
    /// 默认: $XDG_RUNTIME_DIR/pat_input_daemon.lock，其次系统临时目录
    #[arg(long)]
    lock_file: Option<PathBuf>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    init_tracing();
    let args = Args::parse();
    let sink = LogSink::stdout();

    sink.emit(
        LogEvent::action(EventId::ProcessStarted, "main").with_disposition(Disposition::Success),
    );

    let result = run(args, &sink);
    process::exit(finish(result, &sink));
}

/// 记录 `process-terminated` 并映射退出码：正常关闭为 0，致命错误为 1
fn finish(result: Result<(), DaemonError>, sink: &LogSink) -> i32 {
    let (disposition, message, code) = match &result {
        Ok(()) => (Disposition::Success, "PAT input daemon exited cleanly".to_string(), 0),
        Err(e) => {
            error!("PAT input daemon failed: {}", e);
            (Disposition::Failure, e.to_string(), 1)
        },
    };
    sink.emit(
        LogEvent::action(EventId::ProcessTerminated, "main")
            .with_disposition(disposition)
            .message(message),
    );
    code
}

fn run(args: Args, sink: &LogSink) -> Result<(), DaemonError> {
    // 1. 单实例锁
    let lock_path = args.lock_file.unwrap_or_else(singleton::default_lock_path);
    let lock = SingletonLock::try_lock(&lock_path).map_err(|source| DaemonError::Lock {
        path: lock_path.clone(),
        source,
    })?;
    info!("Lock file: {}", lock.path().display());

    // 2. 信号处理：只置位关闭标志
    let shutdown = ShutdownFlag::new();
    if let Err(e) = shutdown.install_handler() {
        warn!("Failed to set signal handler: {}", e);
        sink.emit(
            LogEvent::status(EventId::ErrorSettingSigintHandler, "install_handler")
                .with_disposition(Disposition::Failure)
                .message(e.to_string()),
        );
    }

    // 3. 配置
    let config = PatConfig::default().with_workspace(args.mark_scan_workspace.as_deref());

    if args.skip_hardware_check && !config.hardware_present() {
        return idle_until_shutdown(&config, &shutdown, sink);
    }

    // 4. Starting：虚拟键盘 → 引脚 → 播种
    let keyboard = UinputKeyboard::create(&config.device, &config.keys(), sink.clone())?;
    let mut poller = SignalPoller::start(config, keyboard, sink.clone())?;

    // 5. Running → Stopping → Terminated
    info!("PAT input daemon started (device connected: {})", poller.is_connected());
    poller.run(&shutdown)
}

/// 没有 PAT 端口时空转，直到收到关闭请求
fn idle_until_shutdown(
    config: &PatConfig,
    shutdown: &ShutdownFlag,
    sink: &LogSink,
) -> Result<(), DaemonError> {
    sink.emit(
        LogEvent::status(EventId::Info, "skip_hardware_check")
            .message("No GPIO export control found; skipping PAT hardware and idling"),
    );
    while !shutdown.is_requested() {
        spin_sleep::sleep(config.poll_interval);
    }
    Ok(())
}
