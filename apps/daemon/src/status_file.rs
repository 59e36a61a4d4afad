//! PAT 连接状态文件
//!
//! mark-scan 应用通过工作目录下的 `_pat_connection.status` 得知是否有 PAT 设备接入。
//! 与 GPIO 电平约定一致：`"0"` 表示已连接，`"1"` 表示未连接。

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub const PAT_CONNECTION_STATUS_FILENAME: &str = "_pat_connection.status";

/// 覆盖写入连接状态
pub fn write_connection_status(path: &Path, connected: bool) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let value: &[u8] = if connected { b"0" } else { b"1" };
    file.write_all(value)
}
