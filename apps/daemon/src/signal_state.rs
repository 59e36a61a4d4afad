//! 边沿检测状态
//!
//! 只有 false → true 的上升沿表示一次开关"动作"；保持为 true 或回落都不产生按键。

/// 上升沿：上一 tick 为 false，本 tick 为 true
pub fn rising_edge(previous: bool, current: bool) -> bool {
    current && !previous
}

/// 两个通道上一 tick 的布尔值
///
/// 仅由 `SignalPoller` 持有，每 tick 比较后更新一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalState {
    pub channel_a: bool,
    pub channel_b: bool,
}

/// 本 tick 检测到的上升沿
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub channel_a: bool,
    pub channel_b: bool,
}

impl SignalState {
    pub fn new(channel_a: bool, channel_b: bool) -> Self {
        Self {
            channel_a,
            channel_b,
        }
    }

    /// 与新读数比较（两个通道相互独立）
    pub fn edges(&self, channel_a: bool, channel_b: bool) -> Edges {
        Edges {
            channel_a: rising_edge(self.channel_a, channel_a),
            channel_b: rising_edge(self.channel_b, channel_b),
        }
    }

    /// 存为下一 tick 的"上一值"
    pub fn update(&mut self, channel_a: bool, channel_b: bool) {
        self.channel_a = channel_a;
        self.channel_b = channel_b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pat_gpio::decode_value;
    use proptest::prelude::*;

    #[test]
    fn test_rising_edge_truth_table() {
        assert!(rising_edge(false, true));
        assert!(!rising_edge(false, false));
        assert!(!rising_edge(true, true));
        assert!(!rising_edge(true, false));
    }

    #[test]
    fn test_single_pulse_for_press_hold_release() {
        // false → true → true → false：只在第一个 true 产生一次
        let mut state = SignalState::new(false, false);
        let mut pulses = Vec::new();
        for reading in [false, true, true, false] {
            pulses.push(state.edges(reading, false).channel_a);
            state.update(reading, false);
        }
        assert_eq!(pulses, vec![false, true, false, false]);
    }

    #[test]
    fn test_raw_readings_scenario() {
        // 通道 A 原始值 '1','0','0','1' → false,true,true,false → 第 2 个 tick 一次脉冲
        let mut state = SignalState::new(false, false);
        let mut pulse_ticks = Vec::new();
        for (tick, raw) in [b'1', b'0', b'0', b'1'].into_iter().enumerate() {
            let a = decode_value(raw).unwrap();
            if state.edges(a, false).channel_a {
                pulse_ticks.push(tick + 1);
            }
            state.update(a, false);
        }
        assert_eq!(pulse_ticks, vec![2]);
    }

    #[test]
    fn test_channels_are_independent() {
        let state = SignalState::new(false, true);

        let edges = state.edges(true, true);
        assert_eq!(
            edges,
            Edges {
                channel_a: true,
                channel_b: false
            }
        );

        let state = SignalState::new(false, false);
        let edges = state.edges(true, true);
        assert!(edges.channel_a && edges.channel_b);
    }

    proptest! {
        /// 脉冲数恰好等于 false → true 跳变次数
        #[test]
        fn prop_pulses_match_rising_transitions(
            seed in any::<(bool, bool)>(),
            readings in proptest::collection::vec(any::<(bool, bool)>(), 0..64),
        ) {
            let mut state = SignalState::new(seed.0, seed.1);
            let mut pulses_a = 0usize;
            let mut pulses_b = 0usize;
            for &(a, b) in &readings {
                let edges = state.edges(a, b);
                pulses_a += usize::from(edges.channel_a);
                pulses_b += usize::from(edges.channel_b);
                state.update(a, b);
            }

            let mut prev = seed;
            let mut expected_a = 0usize;
            let mut expected_b = 0usize;
            for &(a, b) in &readings {
                if a && !prev.0 { expected_a += 1; }
                if b && !prev.1 { expected_b += 1; }
                prev = (a, b);
            }

            prop_assert_eq!(pulses_a, expected_a);
            prop_assert_eq!(pulses_b, expected_b);
            // 每个通道两次脉冲之间必有一次释放，所以脉冲数不超过 true 读数
            prop_assert!(pulses_a <= readings.iter().filter(|r| r.0).count());
        }
    }
}
