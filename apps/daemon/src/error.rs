//! 守护进程错误类型

use pat_gpio::GpioError;
use pat_uinput::UinputError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 守护进程级致命错误
///
/// 任何一个都会让进程以非零状态码退出。
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    #[error("Virtual keyboard error: {0}")]
    Uinput(#[from] UinputError),

    #[error("Failed to acquire lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
