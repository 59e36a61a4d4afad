//! sysfs GPIO 路径布局
//!
//! | 路径 | 用途 |
//! |------|------|
//! | `{root}/export` | 写入引脚号以占用引脚 |
//! | `{root}/unexport` | 写入引脚号以释放引脚 |
//! | `{root}/gpio{N}/direction` | 写入 `in` 设为输入 |
//! | `{root}/gpio{N}/value` | 读出 `'0'` 或 `'1'` |

use crate::PinId;
use std::path::{Path, PathBuf};

/// 内核默认挂载点
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// 输入方向令牌
pub const DIRECTION_IN: &[u8] = b"in";

pub fn export_path(root: &Path) -> PathBuf {
    root.join("export")
}

pub fn unexport_path(root: &Path) -> PathBuf {
    root.join("unexport")
}

pub fn pin_dir(root: &Path, pin: PinId) -> PathBuf {
    root.join(format!("gpio{}", pin))
}

pub fn direction_path(root: &Path, pin: PinId) -> PathBuf {
    pin_dir(root, pin).join("direction")
}

pub fn value_path(root: &Path, pin: PinId) -> PathBuf {
    pin_dir(root, pin).join("value")
}
