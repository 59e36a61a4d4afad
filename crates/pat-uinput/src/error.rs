//! uinput 层错误类型

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// uinput 层错误类型
#[derive(Error, Debug)]
pub enum UinputError {
    /// 设备节点无法打开
    #[error("Failed to open uinput device {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// ioctl 请求失败
    #[error("uinput ioctl {request} failed: {source}")]
    Ioctl {
        request: &'static str,
        source: nix::Error,
    },

    /// 写入事件失败
    #[error("Failed to write input events: {0}")]
    Write(#[from] io::Error),

    /// 设备名超出内核限制
    #[error("Device name is too long ({len} bytes, max {max})")]
    NameTooLong { len: usize, max: usize },

    /// 设备已销毁
    #[error("Virtual keyboard already destroyed")]
    Destroyed,
}
