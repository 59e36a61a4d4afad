//! 协作式关闭标志
//!
//! 信号处理上下文中唯一的动作是置位此标志；其余状态变更都在主线程上、
//! 于下一次循环开头观察到标志之后才发生。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 进程级关闭标志
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求关闭（可在信号处理上下文中调用）
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 安装终止信号处理器（SIGINT/SIGTERM/SIGHUP）
    ///
    /// 处理器只置位标志，不做其他任何事。
    pub fn install_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.request())
    }
}
