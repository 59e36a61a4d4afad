//! 输入事件编码
//!
//! 写入 uinput 的事件记录即内核 `struct input_event`：
//! `timeval` + `type` + `code` + `value`。时间戳字段置零，由内核填充。

use crate::KeyCode;
use std::mem;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const SYN_REPORT: u16 = 0;

pub const KEY_PRESSED: i32 = 1;
pub const KEY_RELEASED: i32 = 0;

/// 一条输入事件（不含时间戳）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const fn key(key: KeyCode, value: i32) -> Self {
        Self {
            kind: EV_KEY,
            code: key.code(),
            value,
        }
    }

    pub const fn sync() -> Self {
        Self {
            kind: EV_SYN,
            code: SYN_REPORT,
            value: 0,
        }
    }

    fn to_raw(self) -> libc::input_event {
        // SAFETY: input_event 是纯 POD，全零是合法值
        let mut raw: libc::input_event = unsafe { mem::zeroed() };
        raw.type_ = self.kind;
        raw.code = self.code;
        raw.value = self.value;
        raw
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: &libc::input_event) -> Self {
        Self {
            kind: raw.type_,
            code: raw.code,
            value: raw.value,
        }
    }
}

/// 一次脉冲的事件序列：key-down、sync、key-up、sync
pub const fn pulse_events(key: KeyCode) -> [InputEvent; 4] {
    [
        InputEvent::key(key, KEY_PRESSED),
        InputEvent::sync(),
        InputEvent::key(key, KEY_RELEASED),
        InputEvent::sync(),
    ]
}

/// 把事件序列编码为连续的 `input_event` 字节流
///
/// 调用方用一次 write 写出整个缓冲区，事件之间不会被其他写入插入。
pub fn encode_events(events: &[InputEvent]) -> Vec<u8> {
    let size = mem::size_of::<libc::input_event>();
    let mut buf = Vec::with_capacity(size * events.len());
    for event in events {
        let raw = event.to_raw();
        // SAFETY: raw 是 repr(C) POD，按其大小视为字节切片
        let bytes =
            unsafe { std::slice::from_raw_parts(&raw as *const libc::input_event as *const u8, size) };
        buf.extend_from_slice(bytes);
    }
    buf
}

/// 从字节流解码事件（测试用）
#[cfg(test)]
pub(crate) fn decode_events(bytes: &[u8]) -> Vec<InputEvent> {
    let size = mem::size_of::<libc::input_event>();
    assert_eq!(bytes.len() % size, 0, "truncated input_event stream");
    bytes
        .chunks_exact(size)
        .map(|chunk| {
            // SAFETY: chunk 长度等于 input_event 大小；read_unaligned 不要求对齐
            let raw: libc::input_event =
                unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const libc::input_event) };
            InputEvent::from_raw(&raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_event_order() {
        let events = pulse_events(KeyCode::KEY_1);
        assert_eq!(
            events,
            [
                InputEvent {
                    kind: EV_KEY,
                    code: 2,
                    value: 1
                },
                InputEvent {
                    kind: EV_SYN,
                    code: SYN_REPORT,
                    value: 0
                },
                InputEvent {
                    kind: EV_KEY,
                    code: 2,
                    value: 0
                },
                InputEvent {
                    kind: EV_SYN,
                    code: SYN_REPORT,
                    value: 0
                },
            ]
        );
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode_events(&pulse_events(KeyCode::KEY_2));
        assert_eq!(bytes.len(), 4 * mem::size_of::<libc::input_event>());

        let decoded = decode_events(&bytes);
        assert_eq!(decoded, pulse_events(KeyCode::KEY_2).to_vec());
    }

    #[test]
    fn test_encode_zeroes_timestamp() {
        let bytes = encode_events(&[InputEvent::key(KeyCode::KEY_1, KEY_PRESSED)]);
        let time_len = mem::size_of::<libc::timeval>();
        assert!(bytes[..time_len].iter().all(|&b| b == 0));
    }
}
