//! 审计事件定义

use serde::{Deserialize, Serialize};

/// 事件标识
///
/// 序列化为短小、稳定的 kebab-case 字符串（如 `connect-to-gpio-pin-init`），
/// 下游审计工具按此字符串归类，不可随意改名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventId {
    ProcessStarted,
    ProcessTerminated,
    ErrorSettingSigintHandler,

    CreateVirtualUinputDeviceInit,
    CreateVirtualUinputDeviceComplete,
    DestroyVirtualUinputDeviceInit,
    DestroyVirtualUinputDeviceComplete,
    SendKeypressInit,
    SendKeypressComplete,

    ConnectToGpioPinInit,
    ConnectToGpioPinComplete,
    SetGpioPinDirectionInit,
    SetGpioPinDirectionComplete,
    OpenGpioValueHandleComplete,
    ReadGpioValueComplete,
    CloseGpioValueHandleComplete,
    UnexportGpioPinInit,
    UnexportGpioPinComplete,

    PatDeviceConnectionStatus,
    PatDeviceError,
    Info,
}

impl EventId {
    /// 未显式给出 message 时使用的默认描述
    pub fn description(self) -> &'static str {
        match self {
            EventId::ProcessStarted => "PAT input daemon process started.",
            EventId::ProcessTerminated => "PAT input daemon process terminated.",
            EventId::ErrorSettingSigintHandler => "Failed to install the termination signal handler.",
            EventId::CreateVirtualUinputDeviceInit => "Creating virtual uinput keyboard device.",
            EventId::CreateVirtualUinputDeviceComplete => {
                "Virtual uinput keyboard device creation finished."
            },
            EventId::DestroyVirtualUinputDeviceInit => "Destroying virtual uinput keyboard device.",
            EventId::DestroyVirtualUinputDeviceComplete => {
                "Virtual uinput keyboard device destruction finished."
            },
            EventId::SendKeypressInit => "Sending keypress.",
            EventId::SendKeypressComplete => "Keypress sent.",
            EventId::ConnectToGpioPinInit => "Exporting GPIO pin.",
            EventId::ConnectToGpioPinComplete => "GPIO pin export finished.",
            EventId::SetGpioPinDirectionInit => "Setting GPIO pin direction to input.",
            EventId::SetGpioPinDirectionComplete => "GPIO pin direction set finished.",
            EventId::OpenGpioValueHandleComplete => "Opened GPIO pin value file.",
            EventId::ReadGpioValueComplete => "Read GPIO pin value.",
            EventId::CloseGpioValueHandleComplete => "Closed GPIO pin value file.",
            EventId::UnexportGpioPinInit => "Unexporting GPIO pin.",
            EventId::UnexportGpioPinComplete => "GPIO pin unexport finished.",
            EventId::PatDeviceConnectionStatus => "PAT device connection status read.",
            EventId::PatDeviceError => "Error reading from the built-in PAT device port.",
            EventId::Info => "",
        }
    }
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// 守护进程主动执行的动作
    Action,
    /// 观察到的状态
    Status,
}

/// 处置结果
///
/// `Na` 标记多步动作的开始（结果未知），随后必有一条
/// `Success`/`Failure` 终结事件与之配对。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failure")]
    Failure,
    #[default]
    #[serde(rename = "n/a")]
    Na,
}

impl Disposition {
    /// 由操作结果推导处置结果
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Disposition::Success,
            Err(_) => Disposition::Failure,
        }
    }
}

/// 审计事件
///
/// 一经构造即不可变，只会被输出，不会被修改或存储。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    event_id: EventId,
    event_type: EventType,
    message: Option<String>,
    operation: String,
    disposition: Disposition,
}

impl LogEvent {
    /// 动作事件（默认处置结果为 `n/a`）
    pub fn action(event_id: EventId, operation: impl Into<String>) -> Self {
        Self::new(event_id, EventType::Action, operation)
    }

    /// 状态事件（默认处置结果为 `n/a`）
    pub fn status(event_id: EventId, operation: impl Into<String>) -> Self {
        Self::new(event_id, EventType::Status, operation)
    }

    fn new(event_id: EventId, event_type: EventType, operation: impl Into<String>) -> Self {
        Self {
            event_id,
            event_type,
            message: None,
            operation: operation.into(),
            disposition: Disposition::Na,
        }
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// 消息文本，未设置时回落到 [`EventId::description`]
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or_else(|| self.event_id.description())
    }
}

/// 输出到日志流的一行（键名固定）
///
/// `source` 与 `user` 由 [`LogSink`](crate::LogSink) 填充。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub event_id: EventId,
    pub source: String,
    pub event_type: EventType,
    pub user: String,
    pub message: String,
    pub operation: String,
    pub disposition: Disposition,
}
