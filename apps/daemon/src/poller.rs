//! 边沿检测轮询状态机
//!
//! `Starting → Running → Stopping → Terminated`
//!
//! - **Starting**: export 三个引脚并设为输入，读取初值播种 [`SignalState`]
//! - **Running**: 每个 tick 读取通道 A/B，对上升沿发送按键脉冲
//! - **Stopping**: 先释放全部 GPIO 资源，再销毁虚拟键盘
//!
//! 所有状态变更都在调用 [`SignalPoller::run`] 的线程上完成；
//! 外部只能通过 [`ShutdownFlag`] 请求停止，循环在每个 tick 开头检查一次。

use crate::config::{HEARTBEAT_INTERVAL, PatConfig};
use crate::error::DaemonError;
use crate::shutdown::ShutdownFlag;
use crate::signal_state::SignalState;
use crate::status_file::write_connection_status;
use pat_gpio::{GpioError, GpioPin, ValueHandle};
use pat_logging::{Disposition, EventId, LogEvent, LogSink};
use pat_uinput::{KeyCode, VirtualKeyboard};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 轮询器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Starting,
    Running,
    Stopping,
    Terminated,
}

/// 边沿检测轮询器
///
/// 独占三个 GPIO 引脚与虚拟键盘；只有通道 A/B 会产生按键，
/// 连接状态线仅在启动时读取一次用于播种与观测。
pub struct SignalPoller<K: VirtualKeyboard> {
    config: PatConfig,
    sink: LogSink,
    keyboard: K,
    connection: GpioPin,
    channel_a: GpioPin,
    channel_b: GpioPin,
    signals: SignalState,
    connected: bool,
    /// 本 tick 打开、尚未关闭的 value 句柄
    open_handles: Vec<ValueHandle>,
    state: PollerState,
    last_heartbeat: Instant,
}

impl<K: VirtualKeyboard> SignalPoller<K> {
    /// 启动：占用引脚并播种初始状态
    ///
    /// 引脚或初值读取失败是致命的：已 export 的引脚会被尽力 unexport，
    /// 键盘会被销毁，然后返回错误（由 `main` 决定退出码）。
    /// 连接状态文件写入失败只记录，不阻止启动。
    pub fn start(config: PatConfig, keyboard: K, sink: LogSink) -> Result<Self, DaemonError> {
        let root = config.sysfs_root.clone();
        let mut poller = Self {
            connection: GpioPin::new(config.connection_pin, "connection-status", &root, sink.clone()),
            channel_a: GpioPin::new(config.channel_a_pin, "channel-a", &root, sink.clone()),
            channel_b: GpioPin::new(config.channel_b_pin, "channel-b", &root, sink.clone()),
            config,
            sink,
            keyboard,
            signals: SignalState::default(),
            connected: false,
            open_handles: Vec::new(),
            state: PollerState::Starting,
            last_heartbeat: Instant::now(),
        };

        if let Err(e) = poller.claim_pins().and_then(|()| poller.seed()) {
            error!("Startup failed: {}", e);
            poller.stop();
            return Err(e);
        }

        info!(
            "Polling GPIO pins {} (A) and {} (B) every {:?}",
            poller.config.channel_a_pin, poller.config.channel_b_pin, poller.config.poll_interval
        );
        poller.state = PollerState::Running;
        Ok(poller)
    }

    fn claim_pins(&mut self) -> Result<(), DaemonError> {
        for pin in [&mut self.connection, &mut self.channel_a, &mut self.channel_b] {
            pin.export()?;
            pin.set_direction_in()?;
        }
        Ok(())
    }

    /// 读取三条线的初值
    fn seed(&mut self) -> Result<(), DaemonError> {
        let connected = read_pin(&self.connection, &mut self.open_handles);
        let channel_a = read_pin(&self.channel_a, &mut self.open_handles);
        let channel_b = read_pin(&self.channel_b, &mut self.open_handles);
        self.close_handles();

        let (connected, channel_a, channel_b) = (connected?, channel_a?, channel_b?);
        self.connected = connected;
        self.signals = SignalState::new(channel_a, channel_b);

        let message = if connected {
            "PAT device is connected"
        } else {
            "PAT device is not connected"
        };
        self.sink.emit(
            LogEvent::status(EventId::PatDeviceConnectionStatus, "seed")
                .with_disposition(Disposition::Success)
                .message(message),
        );
        debug!("Seeded state: connected={}, {:?}", connected, self.signals);

        if let Some(path) = &self.config.status_path
            && let Err(e) = write_connection_status(path, connected)
        {
            // 写入失败不阻止启动
            warn!("Failed to write connection status to {}: {}", path.display(), e);
            self.sink.emit(
                LogEvent::status(EventId::PatDeviceConnectionStatus, "write_status_file")
                    .with_disposition(Disposition::Failure)
                    .message(format!(
                        "Failed to write connection status to {}: {}",
                        path.display(),
                        e
                    )),
            );
        }
        Ok(())
    }

    /// 执行一个 tick
    ///
    /// 读取失败是致命的；脉冲失败只记录，状态照常推进，避免按住的开关反复触发。
    pub fn tick(&mut self) -> Result<(), DaemonError> {
        let channel_a = read_pin(&self.channel_a, &mut self.open_handles)?;
        let channel_b = read_pin(&self.channel_b, &mut self.open_handles)?;

        let edges = self.signals.edges(channel_a, channel_b);
        if edges.channel_a {
            self.send_pulse(self.config.channel_a_key);
        }
        if edges.channel_b {
            self.send_pulse(self.config.channel_b_key);
        }

        self.close_handles();
        self.signals.update(channel_a, channel_b);
        Ok(())
    }

    fn send_pulse(&mut self, key: KeyCode) {
        if let Err(e) = self.keyboard.pulse(key) {
            warn!("Failed to send {}: {}", key, e);
        }
    }

    /// 关闭所有未关闭的 value 句柄（失败已由句柄写入审计日志）
    fn close_handles(&mut self) {
        for handle in self.open_handles.drain(..) {
            let pin = handle.pin();
            if let Err(e) = handle.close() {
                warn!("Failed to close value handle of GPIO pin {}: {}", pin, e);
            }
        }
    }

    /// 主循环，阻塞直到关闭标志被置位或出现致命错误
    ///
    /// 两种情况都会完整执行 Stopping 流程后才返回。
    pub fn run(&mut self, shutdown: &ShutdownFlag) -> Result<(), DaemonError> {
        let period = self.config.poll_interval;
        let mut next_tick = Instant::now();
        let mut outcome = Ok(());

        while self.state == PollerState::Running {
            if shutdown.is_requested() {
                info!("Shutdown requested");
                break;
            }

            if self.last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
                debug!("Polling for status");
                self.last_heartbeat = Instant::now();
            }

            if let Err(e) = self.tick() {
                error!("Fatal error while polling: {}", e);
                self.sink.emit(
                    LogEvent::status(EventId::PatDeviceError, "poll")
                        .with_disposition(Disposition::Failure)
                        .message(e.to_string()),
                );
                outcome = Err(e);
                break;
            }

            if shutdown.is_requested() {
                continue;
            }

            // 睡眠到下一个锚点（扣除 tick 本身的耗时）
            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                warn!(
                    "Poll loop overrun by {:?}, skipping sleep",
                    now.duration_since(next_tick)
                );
                next_tick = now;
            }
        }

        self.stop();
        outcome
    }

    /// Stopping 流程：释放引脚与句柄，然后销毁键盘
    ///
    /// 每一步都是尽力而为，失败只记录，后续步骤照常执行。
    /// 排空延时由键盘的 `destroy` 负责。重复调用无副作用。
    pub fn stop(&mut self) {
        if self.state == PollerState::Terminated {
            return;
        }
        self.state = PollerState::Stopping;

        for pin in [&mut self.connection, &mut self.channel_a, &mut self.channel_b] {
            if let Err(e) = pin.unexport() {
                warn!("Failed to unexport GPIO pin {} ({}): {}", pin.id(), pin.name(), e);
            }
        }
        self.close_handles();

        if let Err(e) = self.keyboard.destroy() {
            warn!("Failed to destroy virtual keyboard: {}", e);
        }

        self.state = PollerState::Terminated;
    }

    #[cfg(test)]
    pub fn state(&self) -> PollerState {
        self.state
    }

    #[cfg(test)]
    pub fn signals(&self) -> SignalState {
        self.signals
    }

    /// 启动时读取的连接状态
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// 打开新句柄并读取一次；句柄交给 `open_handles`，出错时也由 Stopping 流程关闭
fn read_pin(pin: &GpioPin, open_handles: &mut Vec<ValueHandle>) -> Result<bool, GpioError> {
    let mut handle = pin.open_value_handle()?;
    let value = handle.read_boolean();
    open_handles.push(handle);
    value
}
