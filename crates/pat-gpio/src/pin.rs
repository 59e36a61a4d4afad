//! sysfs 数字输入引脚

use crate::GpioError;
use crate::sysfs;
use pat_logging::{Disposition, EventId, LogEvent, LogSink};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::IntoRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// 内核 GPIO 引脚号
///
/// 以十进制、不补零的形式写入 export/unexport（内核按十进制解析，前导零无意义）。
/// PAT 端口的三条线都是三位数（476/478/481），所以写入长度固定为 3 字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(u16);

impl PinId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 将 value 文件中的原始字节映射为布尔值
///
/// 极性反转：空闲时电平为 `'1'`，开关动作/设备连接会把线路拉到 `'0'`。
///
/// | 原始值 | 结果 |
/// |--------|------|
/// | `'0'` | `Some(true)`（已动作） |
/// | `'1'` | `Some(false)`（空闲） |
/// | 其他 | `None` |
pub fn decode_value(raw: u8) -> Option<bool> {
    match raw {
        b'0' => Some(true),
        b'1' => Some(false),
        _ => None,
    }
}

/// 一个由内核通过 sysfs 暴露的数字输入引脚
///
/// 引脚只会被配置为输入方向。所有动作和失败都会写入审计日志，
/// 但错误一律以 `Result` 返回，由调用方决定是否终止进程。
#[derive(Debug)]
pub struct GpioPin {
    id: PinId,
    /// 用于日志的可读名称（如 "channel-a"）
    name: &'static str,
    root: PathBuf,
    exported: bool,
    direction_in: bool,
    sink: LogSink,
}

impl GpioPin {
    /// 创建引脚（尚未 export）
    ///
    /// # 参数
    /// - `id`: 内核引脚号
    /// - `name`: 日志中使用的名称
    /// - `root`: sysfs GPIO 根目录（通常为 `/sys/class/gpio`）
    /// - `sink`: 审计日志输出端
    pub fn new(id: PinId, name: &'static str, root: impl Into<PathBuf>, sink: LogSink) -> Self {
        Self {
            id,
            name,
            root: root.into(),
            exported: false,
            direction_in: false,
            sink,
        }
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    pub fn is_input(&self) -> bool {
        self.direction_in
    }

    /// 向 export 控制文件写入引脚号，从内核占用该引脚
    ///
    /// 若内核返回 EBUSY，说明引脚已被之前的运行占用，视为成功。
    pub fn export(&mut self) -> Result<(), GpioError> {
        self.sink.emit(
            LogEvent::action(EventId::ConnectToGpioPinInit, "export")
                .message(format!("Exporting GPIO pin {} ({})", self.id, self.name)),
        );

        let path = sysfs::export_path(&self.root);
        let result = match write_control(&path, self.id, self.id.to_string().as_bytes()) {
            Err(e) if e.is_busy() => {
                debug!("GPIO pin {} is already exported", self.id);
                Ok(true)
            },
            other => other.map(|()| false),
        };

        let message = match &result {
            Ok(false) => format!("Exported GPIO pin {} ({})", self.id, self.name),
            Ok(true) => format!("GPIO pin {} ({}) was already exported", self.id, self.name),
            Err(e) => e.to_string(),
        };
        self.sink.emit(
            LogEvent::action(EventId::ConnectToGpioPinComplete, "export")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        result.map(|_| self.exported = true)
    }

    /// 向 direction 控制文件写入 `in`
    pub fn set_direction_in(&mut self) -> Result<(), GpioError> {
        self.sink.emit(
            LogEvent::action(EventId::SetGpioPinDirectionInit, "set_direction_in")
                .message(format!("Setting GPIO pin {} ({}) direction to in", self.id, self.name)),
        );

        let path = sysfs::direction_path(&self.root, self.id);
        let result = write_control(&path, self.id, sysfs::DIRECTION_IN);

        let message = match &result {
            Ok(()) => format!("GPIO pin {} ({}) direction set to in", self.id, self.name),
            Err(e) => e.to_string(),
        };
        self.sink.emit(
            LogEvent::action(EventId::SetGpioPinDirectionComplete, "set_direction_in")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        result.map(|()| self.direction_in = true)
    }

    /// 打开一个新的 value 读取句柄
    ///
    /// 每次读取前都必须调用；句柄不能跨 tick 复用。
    /// 成功路径不写日志（每 tick 都会调用）。
    pub fn open_value_handle(&self) -> Result<ValueHandle, GpioError> {
        let path = sysfs::value_path(&self.root, self.id);
        match File::open(&path) {
            Ok(file) => {
                trace!("Opened value handle for GPIO pin {}", self.id);
                Ok(ValueHandle {
                    pin: self.id,
                    file,
                    sink: self.sink.clone(),
                })
            },
            Err(source) => {
                let err = GpioError::Open {
                    pin: self.id,
                    path,
                    source,
                };
                self.sink.emit(
                    LogEvent::action(EventId::OpenGpioValueHandleComplete, "open_value_handle")
                        .with_disposition(Disposition::Failure)
                        .message(err.to_string()),
                );
                Err(err)
            },
        }
    }

    /// 向 unexport 控制文件写入引脚号，把引脚交还内核
    ///
    /// 在关闭流程中调用，调用方只记录不升级。未 export 的引脚直接返回 `Ok`。
    pub fn unexport(&mut self) -> Result<(), GpioError> {
        if !self.exported {
            return Ok(());
        }

        self.sink.emit(
            LogEvent::action(EventId::UnexportGpioPinInit, "unexport")
                .message(format!("Unexporting GPIO pin {} ({})", self.id, self.name)),
        );

        let path = sysfs::unexport_path(&self.root);
        let result = write_control(&path, self.id, self.id.to_string().as_bytes());

        let message = match &result {
            Ok(()) => format!("Unexported GPIO pin {} ({})", self.id, self.name),
            Err(e) => e.to_string(),
        };
        self.sink.emit(
            LogEvent::action(EventId::UnexportGpioPinComplete, "unexport")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        result.map(|()| {
            self.exported = false;
            self.direction_in = false;
        })
    }
}

/// 写入控制文件：必须一次写完全部字节
fn write_control(path: &Path, pin: PinId, bytes: &[u8]) -> Result<(), GpioError> {
    let mut file = OpenOptions::new().write(true).open(path).map_err(|source| GpioError::Open {
        pin,
        path: path.to_path_buf(),
        source,
    })?;

    let written = file.write(bytes).map_err(|source| GpioError::Write {
        pin,
        path: path.to_path_buf(),
        source,
    })?;

    if written != bytes.len() {
        return Err(GpioError::ShortWrite {
            pin,
            path: path.to_path_buf(),
            expected: bytes.len(),
            written,
        });
    }

    Ok(())
}

/// 一次性的 value 读取句柄
///
/// 由 [`GpioPin::open_value_handle`] 创建，读取后通过 [`ValueHandle::close`] 关闭。
#[derive(Debug)]
pub struct ValueHandle {
    pin: PinId,
    file: File,
    sink: LogSink,
}

impl ValueHandle {
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// 读取恰好一个字节并按反转极性映射为布尔值
    ///
    /// `'0'` → `true`，`'1'` → `false`；其他内容返回错误。
    pub fn read_boolean(&mut self) -> Result<bool, GpioError> {
        let mut buf = [0u8; 1];
        let result = match self.file.read(&mut buf) {
            Ok(0) => Err(GpioError::EmptyRead { pin: self.pin }),
            Ok(_) => decode_value(buf[0]).ok_or(GpioError::InvalidValue {
                pin: self.pin,
                value: buf[0],
            }),
            Err(source) => Err(GpioError::Read {
                pin: self.pin,
                source,
            }),
        };

        if let Err(e) = &result {
            self.sink.emit(
                LogEvent::action(EventId::ReadGpioValueComplete, "read_value")
                    .with_disposition(Disposition::Failure)
                    .message(e.to_string()),
            );
        }
        result
    }

    /// 显式关闭句柄，以便报告 close(2) 的错误（`Drop` 会吞掉它）
    pub fn close(self) -> Result<(), GpioError> {
        let ValueHandle { pin, file, sink } = self;
        let fd = file.into_raw_fd();
        // SAFETY: fd 来自 into_raw_fd，所有权已转移，此后不再使用
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            let err = GpioError::Close {
                pin,
                source: std::io::Error::last_os_error(),
            };
            sink.emit(
                LogEvent::action(EventId::CloseGpioValueHandleComplete, "close_value_handle")
                    .with_disposition(Disposition::Failure)
                    .message(err.to_string()),
            );
            return Err(err);
        }
        Ok(())
    }
}
