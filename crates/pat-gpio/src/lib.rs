//! # PAT GPIO Layer
//!
//! 通过内核 sysfs 接口（`/sys/class/gpio`）访问数字输入引脚。
//!
//! 每个引脚的生命周期：
//!
//! 1. 启动时 `export` + `set_direction_in`
//! 2. 每个轮询 tick：`open_value_handle` → `read_boolean` → `close`
//! 3. 关闭时 `unexport`（尽力而为）
//!
//! 值句柄不能跨 tick 缓存：已打开的 sysfs value 文件会返回过期的值，
//! 所以每次读取前都必须重新打开。
//!
//! 本层只返回 `Result`，不终止进程；是否致命由调用方决定。

mod error;
mod pin;
pub mod sysfs;

pub use error::GpioError;
pub use pin::{GpioPin, PinId, ValueHandle, decode_value};
