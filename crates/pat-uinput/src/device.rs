//! `/dev/uinput` 虚拟键盘实现
//!
//! 创建顺序（内核要求）：
//!
//! 1. `UI_SET_EVBIT(EV_KEY)` 声明按键事件
//! 2. 对每个按键 `UI_SET_KEYBIT(code)`
//! 3. `UI_DEV_SETUP` 提交设备描述（总线类型、VID/PID、名称）
//! 4. `UI_DEV_CREATE` 使设备对系统可见
//!
//! 销毁时发送 `UI_DEV_DESTROY` 并关闭句柄。

use crate::event::{EV_KEY, encode_events, pulse_events};
use crate::{KeyCode, UinputError, VirtualKeyboard};
use pat_logging::{Disposition, EventId, LogEvent, LogSink};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// 内核 `UINPUT_MAX_NAME_SIZE`
pub const UINPUT_MAX_NAME_SIZE: usize = 80;

/// 内核 `BUS_USB`
pub const BUS_USB: u16 = 0x03;

/// 默认设备节点
const UINPUT_PATH: &str = "/dev/uinput";

#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

/// 内核 `struct uinput_setup`
#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [libc::c_char; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

mod ioctl {
    use super::UinputSetup;

    nix::ioctl_none!(ui_dev_create, b'U', 1);
    nix::ioctl_none!(ui_dev_destroy, b'U', 2);
    nix::ioctl_write_ptr!(ui_dev_setup, b'U', 3, UinputSetup);
    nix::ioctl_write_int!(ui_set_evbit, b'U', 100);
    nix::ioctl_write_int!(ui_set_keybit, b'U', 101);
}

/// 虚拟设备描述
///
/// 总线类型、VID/PID 与名称只是占位值，下游不会解释它们。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub bus_type: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub name: String,
    /// 创建后/销毁前的固定等待
    ///
    /// 内核设备发现没有就绪握手，下游消费者需要时间发现新设备，
    /// 销毁前也需要时间读走刚发出的事件。
    pub settle: Duration,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self {
            bus_type: BUS_USB,
            vendor: 0x1234,
            product: 0x5678,
            version: 1,
            name: "PAT Input Daemon Virtual Device".to_string(),
            settle: Duration::from_secs(1),
        }
    }
}

impl DeviceDescriptor {
    fn to_setup(&self) -> Result<UinputSetup, UinputError> {
        let bytes = self.name.as_bytes();
        // 需要保留结尾 NUL
        if bytes.len() >= UINPUT_MAX_NAME_SIZE {
            return Err(UinputError::NameTooLong {
                len: bytes.len(),
                max: UINPUT_MAX_NAME_SIZE - 1,
            });
        }

        let mut name = [0 as libc::c_char; UINPUT_MAX_NAME_SIZE];
        for (dst, &src) in name.iter_mut().zip(bytes) {
            *dst = src as libc::c_char;
        }

        Ok(UinputSetup {
            id: InputId {
                bustype: self.bus_type,
                vendor: self.vendor,
                product: self.product,
                version: self.version,
            },
            name,
            ff_effects_max: 0,
        })
    }
}

/// 基于 `/dev/uinput` 的虚拟键盘
///
/// # 示例
///
/// ```no_run
/// use pat_logging::LogSink;
/// use pat_uinput::{DeviceDescriptor, KeyCode, UinputKeyboard, VirtualKeyboard};
///
/// let mut keyboard = UinputKeyboard::create(
///     &DeviceDescriptor::default(),
///     &[KeyCode::KEY_1, KeyCode::KEY_2],
///     LogSink::stdout(),
/// )
/// .unwrap();
/// keyboard.pulse(KeyCode::KEY_1).unwrap();
/// keyboard.destroy().unwrap();
/// ```
#[derive(Debug)]
pub struct UinputKeyboard {
    /// `None` 表示已销毁
    file: Option<File>,
    settle: Duration,
    sink: LogSink,
}

impl UinputKeyboard {
    /// 在 `/dev/uinput` 上创建虚拟键盘
    pub fn create(
        descriptor: &DeviceDescriptor,
        keys: &[KeyCode],
        sink: LogSink,
    ) -> Result<Self, UinputError> {
        Self::create_at(Path::new(UINPUT_PATH), descriptor, keys, sink)
    }

    /// 在指定设备节点上创建虚拟键盘
    ///
    /// 只启用 `keys` 中的按键。成功后等待 `descriptor.settle` 再返回。
    pub fn create_at(
        path: &Path,
        descriptor: &DeviceDescriptor,
        keys: &[KeyCode],
        sink: LogSink,
    ) -> Result<Self, UinputError> {
        sink.emit(
            LogEvent::action(EventId::CreateVirtualUinputDeviceInit, "create")
                .message(format!("Creating virtual keyboard '{}'", descriptor.name)),
        );

        let result = open_device(path).and_then(|file| {
            configure(&file, descriptor, keys)?;
            Ok(file)
        });

        let message = match &result {
            Ok(_) => format!("Created virtual keyboard '{}'", descriptor.name),
            Err(e) => e.to_string(),
        };
        sink.emit(
            LogEvent::action(EventId::CreateVirtualUinputDeviceComplete, "create")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        let file = result?;
        debug!(
            "Waiting {:?} for consumers to discover '{}'",
            descriptor.settle, descriptor.name
        );
        std::thread::sleep(descriptor.settle);

        Ok(Self {
            file: Some(file),
            settle: descriptor.settle,
            sink,
        })
    }

    /// 设备是否仍存在
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    /// 用已打开的文件构造（跳过 ioctl，测试用）
    #[cfg(test)]
    fn from_file(file: File, settle: Duration, sink: LogSink) -> Self {
        Self {
            file: Some(file),
            settle,
            sink,
        }
    }
}

fn open_device(path: &Path) -> Result<File, UinputError> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| UinputError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn configure(file: &File, descriptor: &DeviceDescriptor, keys: &[KeyCode]) -> Result<(), UinputError> {
    let fd = file.as_raw_fd();
    let setup = descriptor.to_setup()?;

    // SAFETY: fd 在 file 生命周期内有效；参数类型与内核 ioctl 定义一致
    unsafe {
        ioctl::ui_set_evbit(fd, EV_KEY as _).map_err(|source| UinputError::Ioctl {
            request: "UI_SET_EVBIT",
            source,
        })?;

        for key in keys {
            ioctl::ui_set_keybit(fd, key.code() as _).map_err(|source| UinputError::Ioctl {
                request: "UI_SET_KEYBIT",
                source,
            })?;
        }

        ioctl::ui_dev_setup(fd, &setup).map_err(|source| UinputError::Ioctl {
            request: "UI_DEV_SETUP",
            source,
        })?;

        ioctl::ui_dev_create(fd).map_err(|source| UinputError::Ioctl {
            request: "UI_DEV_CREATE",
            source,
        })?;
    }

    Ok(())
}

impl VirtualKeyboard for UinputKeyboard {
    fn pulse(&mut self, key: KeyCode) -> Result<(), UinputError> {
        self.sink.emit(
            LogEvent::action(EventId::SendKeypressInit, "pulse")
                .message(format!("Sending keypress {}", key)),
        );

        let result = match self.file.as_mut() {
            Some(file) => {
                // 四个事件一次写出，消费者不会看到半个脉冲
                let buf = encode_events(&pulse_events(key));
                file.write_all(&buf).map_err(UinputError::from)
            },
            None => Err(UinputError::Destroyed),
        };

        let message = match &result {
            Ok(()) => format!("Sent keypress {}", key),
            Err(e) => format!("Failed to send keypress {}: {}", key, e),
        };
        self.sink.emit(
            LogEvent::action(EventId::SendKeypressComplete, "pulse")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        trace!("pulse {} -> {:?}", key, result.is_ok());
        result
    }

    fn destroy(&mut self) -> Result<(), UinputError> {
        let Some(file) = self.file.take() else {
            return Err(UinputError::Destroyed);
        };

        self.sink.emit(LogEvent::action(EventId::DestroyVirtualUinputDeviceInit, "destroy"));

        // 排空延时：给消费者时间读走最后一个脉冲
        std::thread::sleep(self.settle);

        // SAFETY: fd 在 file 生命周期内有效
        let result = unsafe { ioctl::ui_dev_destroy(file.as_raw_fd()) }
            .map(|_| ())
            .map_err(|source| UinputError::Ioctl {
                request: "UI_DEV_DESTROY",
                source,
            });
        drop(file);

        let message = match &result {
            Ok(()) => "Destroyed virtual keyboard".to_string(),
            Err(e) => e.to_string(),
        };
        self.sink.emit(
            LogEvent::action(EventId::DestroyVirtualUinputDeviceComplete, "destroy")
                .with_disposition(Disposition::of(&result))
                .message(message),
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EV_SYN, InputEvent, decode_events};
    use pat_logging::EventId;

    fn no_settle() -> DeviceDescriptor {
        DeviceDescriptor {
            settle: Duration::ZERO,
            ..DeviceDescriptor::default()
        }
    }

    #[test]
    fn test_descriptor_name_too_long() {
        let descriptor = DeviceDescriptor {
            name: "x".repeat(UINPUT_MAX_NAME_SIZE),
            ..no_settle()
        };
        assert!(matches!(
            descriptor.to_setup(),
            Err(UinputError::NameTooLong { len: 80, max: 79 })
        ));
    }

    #[test]
    fn test_descriptor_setup_fields() {
        let setup = no_settle().to_setup().unwrap();
        assert_eq!(setup.id.bustype, BUS_USB);
        assert_eq!(setup.id.vendor, 0x1234);
        assert_eq!(setup.id.product, 0x5678);
        let name: Vec<u8> = setup.name.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
        assert_eq!(name, b"PAT Input Daemon Virtual Device");
    }

    #[test]
    fn test_create_missing_device_node() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, capture) = LogSink::capture();

        let err = UinputKeyboard::create_at(
            &dir.path().join("uinput"),
            &no_settle(),
            &[KeyCode::KEY_1, KeyCode::KEY_2],
            sink,
        )
        .unwrap_err();
        assert!(matches!(err, UinputError::Open { .. }));

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event_id, EventId::CreateVirtualUinputDeviceInit);
        assert_eq!(lines[1].event_id, EventId::CreateVirtualUinputDeviceComplete);
        assert_eq!(lines[1].disposition, Disposition::Failure);
    }

    #[test]
    fn test_create_on_non_uinput_file_fails_ioctl() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (sink, capture) = LogSink::capture();

        let err = UinputKeyboard::create_at(file.path(), &no_settle(), &[KeyCode::KEY_1], sink)
            .unwrap_err();
        assert!(
            matches!(
                err,
                UinputError::Ioctl {
                    request: "UI_SET_EVBIT",
                    ..
                }
            ),
            "{:?}",
            err
        );
        assert_eq!(capture.lines()[1].disposition, Disposition::Failure);
    }

    #[test]
    fn test_pulse_writes_four_events_in_order() {
        let out = tempfile::NamedTempFile::new().unwrap();
        let file = OpenOptions::new().write(true).open(out.path()).unwrap();
        let (sink, capture) = LogSink::capture();
        let mut keyboard = UinputKeyboard::from_file(file, Duration::ZERO, sink);

        keyboard.pulse(KeyCode::KEY_1).unwrap();
        keyboard.pulse(KeyCode::KEY_2).unwrap();

        let events = decode_events(&std::fs::read(out.path()).unwrap());
        assert_eq!(events.len(), 8);
        assert_eq!(&events[..4], &pulse_events(KeyCode::KEY_1));
        assert_eq!(&events[4..], &pulse_events(KeyCode::KEY_2));
        assert_eq!(events[1], InputEvent::sync());
        assert_eq!(events[3].kind, EV_SYN);

        assert_eq!(
            capture.event_ids(),
            vec![
                EventId::SendKeypressInit,
                EventId::SendKeypressComplete,
                EventId::SendKeypressInit,
                EventId::SendKeypressComplete,
            ]
        );
        assert_eq!(capture.lines()[1].disposition, Disposition::Success);
    }

    #[test]
    fn test_destroy_releases_handle_even_on_ioctl_failure() {
        let out = tempfile::NamedTempFile::new().unwrap();
        let file = OpenOptions::new().write(true).open(out.path()).unwrap();
        let (sink, capture) = LogSink::capture();
        let mut keyboard = UinputKeyboard::from_file(file, Duration::ZERO, sink);

        // 普通文件不支持 UI_DEV_DESTROY
        assert!(matches!(keyboard.destroy(), Err(UinputError::Ioctl { .. })));
        assert!(!keyboard.is_active());
        assert_eq!(
            capture.event_ids(),
            vec![
                EventId::DestroyVirtualUinputDeviceInit,
                EventId::DestroyVirtualUinputDeviceComplete
            ]
        );

        assert!(matches!(keyboard.destroy(), Err(UinputError::Destroyed)));
        assert!(matches!(keyboard.pulse(KeyCode::KEY_1), Err(UinputError::Destroyed)));
    }
}
