//! GPIO 层错误类型

use crate::PinId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// GPIO 层错误类型
#[derive(Error, Debug)]
pub enum GpioError {
    /// 控制文件或 value 文件无法打开
    #[error("Failed to open {path:?} for GPIO pin {pin}: {source}")]
    Open {
        pin: PinId,
        path: PathBuf,
        source: io::Error,
    },

    /// 写入控制文件失败
    #[error("Failed to write {path:?} for GPIO pin {pin}: {source}")]
    Write {
        pin: PinId,
        path: PathBuf,
        source: io::Error,
    },

    /// 只写入了部分字节
    #[error("Short write to {path:?} for GPIO pin {pin}: wrote {written} of {expected} bytes")]
    ShortWrite {
        pin: PinId,
        path: PathBuf,
        expected: usize,
        written: usize,
    },

    /// 读取 value 文件失败
    #[error("Failed to read value of GPIO pin {pin}: {source}")]
    Read { pin: PinId, source: io::Error },

    /// value 文件为空
    #[error("GPIO pin {pin} returned no value")]
    EmptyRead { pin: PinId },

    /// value 既不是 '0' 也不是 '1'
    #[error("GPIO pin {pin} returned unexpected value byte 0x{value:02x}")]
    InvalidValue { pin: PinId, value: u8 },

    /// 关闭 value 句柄失败
    #[error("Failed to close value handle of GPIO pin {pin}: {source}")]
    Close { pin: PinId, source: io::Error },
}

impl GpioError {
    /// 出错的引脚
    pub fn pin(&self) -> PinId {
        match self {
            GpioError::Open { pin, .. }
            | GpioError::Write { pin, .. }
            | GpioError::ShortWrite { pin, .. }
            | GpioError::Read { pin, .. }
            | GpioError::EmptyRead { pin }
            | GpioError::InvalidValue { pin, .. }
            | GpioError::Close { pin, .. } => *pin,
        }
    }

    /// 内核返回 EBUSY（引脚已被占用，通常是上一次运行未释放）
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            GpioError::Write { source, .. } if source.raw_os_error() == Some(libc::EBUSY)
        )
    }
}
