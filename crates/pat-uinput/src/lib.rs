//! # PAT Virtual Keyboard
//!
//! 通过 Linux uinput 创建内核级虚拟键盘，把 PAT 开关动作转换成标准按键事件。
//!
//! - [`VirtualKeyboard`]: 按键脉冲 + 销毁的最小接口（守护进程依赖此 trait，测试可替换）
//! - [`UinputKeyboard`]: 基于 `/dev/uinput` 的实现
//! - [`pulse_events`]: 一次脉冲的四个事件 `[key-down, sync, key-up, sync]`
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **权限要求**：需要对 `/dev/uinput` 的写权限（通常为 root 或 `input` 组）

mod device;
mod error;
mod event;

pub use device::{BUS_USB, DeviceDescriptor, UINPUT_MAX_NAME_SIZE, UinputKeyboard};
pub use error::UinputError;
pub use event::{
    EV_KEY, EV_SYN, InputEvent, KEY_PRESSED, KEY_RELEASED, SYN_REPORT, encode_events, pulse_events,
};

use std::fmt;

/// Linux 按键码（`input-event-codes.h`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(u16);

impl KeyCode {
    pub const KEY_1: KeyCode = KeyCode(2);
    pub const KEY_2: KeyCode = KeyCode(3);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            KeyCode::KEY_1 => write!(f, "KEY_1"),
            KeyCode::KEY_2 => write!(f, "KEY_2"),
            KeyCode(code) => write!(f, "KEY({})", code),
        }
    }
}

/// 虚拟键盘
///
/// 守护进程只需要两种能力：发送一次完整的按键脉冲，以及在关闭时销毁设备。
pub trait VirtualKeyboard {
    /// 发送一次脉冲：key-down、sync、key-up、sync，作为不可分割的整体
    fn pulse(&mut self, key: KeyCode) -> Result<(), UinputError>;

    /// 销毁设备并释放底层句柄
    ///
    /// 实现需在销毁前等待排空延时，避免刚发出的脉冲丢失。
    fn destroy(&mut self) -> Result<(), UinputError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_code_values() {
        assert_eq!(KeyCode::KEY_1.code(), 2);
        assert_eq!(KeyCode::KEY_2.code(), 3);
        assert_eq!(KeyCode::KEY_1.to_string(), "KEY_1");
        assert_eq!(KeyCode::new(28).to_string(), "KEY(28)");
    }
}
