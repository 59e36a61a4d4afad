//! 守护进程配置
//!
//! 三个引脚号与轮询间隔是编译期常量，没有 CLI/环境变量入口；
//! 启动时构造一次 [`PatConfig`] 并向下传递，测试可替换 sysfs 根目录与延时。

use crate::status_file::PAT_CONNECTION_STATUS_FILENAME;
use pat_gpio::PinId;
use pat_gpio::sysfs::{self, DEFAULT_SYSFS_ROOT};
use pat_uinput::{DeviceDescriptor, KeyCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// PAT 设备连接状态线
pub const CONNECTION_STATUS_PIN: PinId = PinId::new(478);
/// 通道 A 开关线
pub const CHANNEL_A_PIN: PinId = PinId::new(481);
/// 通道 B 开关线
pub const CHANNEL_B_PIN: PinId = PinId::new(476);

/// 轮询间隔（一个 tick）
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// "Polling for status" 心跳的最小间隔
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// 守护进程配置
#[derive(Debug, Clone)]
pub struct PatConfig {
    /// sysfs GPIO 根目录
    pub sysfs_root: PathBuf,

    /// 连接状态线（仅用于启动时播种与观测，不产生按键）
    pub connection_pin: PinId,

    /// 通道 A
    pub channel_a_pin: PinId,

    /// 通道 B
    pub channel_b_pin: PinId,

    /// 轮询间隔（默认 100ms）
    pub poll_interval: Duration,

    /// 通道 A 映射的按键
    pub channel_a_key: KeyCode,

    /// 通道 B 映射的按键
    pub channel_b_key: KeyCode,

    /// 虚拟键盘描述（含创建/销毁等待）
    pub device: DeviceDescriptor,

    /// 连接状态文件路径（可选）
    pub status_path: Option<PathBuf>,
}

impl Default for PatConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            connection_pin: CONNECTION_STATUS_PIN,
            channel_a_pin: CHANNEL_A_PIN,
            channel_b_pin: CHANNEL_B_PIN,
            poll_interval: POLL_INTERVAL,
            channel_a_key: KeyCode::KEY_1,
            channel_b_key: KeyCode::KEY_2,
            device: DeviceDescriptor::default(),
            status_path: None,
        }
    }
}

impl PatConfig {
    /// 在 mark-scan 工作目录下写连接状态文件
    pub fn with_workspace(mut self, workspace: Option<&Path>) -> Self {
        self.status_path = workspace.map(|dir| dir.join(PAT_CONNECTION_STATUS_FILENAME));
        self
    }

    /// 虚拟键盘需要启用的按键
    pub fn keys(&self) -> [KeyCode; 2] {
        [self.channel_a_key, self.channel_b_key]
    }

    /// export 控制文件是否存在（无 PAT 端口的开发机上不存在）
    pub fn hardware_present(&self) -> bool {
        sysfs::export_path(&self.sysfs_root).exists()
    }
}
