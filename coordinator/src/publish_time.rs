use chrono::{DateTime, Utc};
use zkr_rollup_interface::{BridgeResolver, Clock, RollupTimeouts, Timeout};

/// Computes rollup-number-aligned wall-clock publish boundaries from the base
/// publish interval and the per-bridge frequency configuration.
///
/// All arithmetic is performed on UTC epoch seconds; the timezone of the
/// input clock is irrelevant to the result.
pub struct PublishTimeManager<Br, Ck> {
    base_interval_secs: f64,
    bridge_resolver: Br,
    clock: Ck,
}

fn datetime_from_secs(secs: f64) -> DateTime<Utc> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos).expect("publish boundary out of datetime range")
}

impl<Br, Ck> PublishTimeManager<Br, Ck>
where
    Br: BridgeResolver,
    Ck: Clock,
{
    /// Creates a manager for the given base interval.
    pub fn new(base_interval_secs: f64, bridge_resolver: Br, clock: Ck) -> Self {
        Self {
            base_interval_secs,
            bridge_resolver,
            clock,
        }
    }

    /// The most recent past publish boundaries.
    pub fn last_timeouts(&self) -> RollupTimeouts {
        self.boundaries(0)
    }

    /// The next future publish boundaries.
    pub fn next_timeouts(&self) -> RollupTimeouts {
        self.boundaries(1)
    }

    fn boundaries(&self, offset: u64) -> RollupTimeouts {
        // Sub-second intervals disable deadline tracking entirely.
        if self.base_interval_secs < 1.0 {
            return RollupTimeouts::default();
        }

        let now_secs = self.clock.now().timestamp_millis() as f64 / 1_000.0;

        let base_rollup_number = (now_secs / self.base_interval_secs).floor() as u64;
        let base_number = base_rollup_number + offset;
        let base_timeout = Timeout {
            time: datetime_from_secs(base_number as f64 * self.base_interval_secs),
            rollup_number: base_number,
        };

        let mut bridge_timeouts = std::collections::HashMap::new();
        for config in self.bridge_resolver.bridge_configs() {
            if config.rollup_frequency < 1 {
                continue;
            }
            // Bridge boundaries are whole multiples of the base interval, so
            // every bridge deadline coincides with a base deadline.
            let bridge_interval_secs = self.base_interval_secs * config.rollup_frequency as f64;
            let bridge_number = (now_secs / bridge_interval_secs).floor() as u64 + offset;
            bridge_timeouts.insert(
                config.bridge_call_data,
                Timeout {
                    time: datetime_from_secs(bridge_number as f64 * bridge_interval_secs),
                    rollup_number: bridge_number,
                },
            );
        }

        RollupTimeouts {
            base_timeout: Some(base_timeout),
            bridge_timeouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use zkr_rollup_interface::mocks::{FixedClock, MockBridgeResolver};
    use zkr_rollup_interface::BridgeConfig;

    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn bridge_config(bridge_call_data: u64, rollup_frequency: i32) -> BridgeConfig {
        BridgeConfig {
            bridge_call_data: U256::from(bridge_call_data),
            num_txs: 5,
            gas: 1_000_000,
            rollup_frequency,
        }
    }

    fn manager(
        base_interval_secs: f64,
        configs: Vec<BridgeConfig>,
        now: DateTime<Utc>,
    ) -> PublishTimeManager<MockBridgeResolver, FixedClock> {
        PublishTimeManager::new(
            base_interval_secs,
            MockBridgeResolver::new(configs),
            FixedClock::new(now),
        )
    }

    #[test]
    fn base_boundaries_bracket_now() {
        let manager = manager(3_600.0, vec![], utc("2021-11-11T09:30:00Z"));

        let last = manager.last_timeouts().base_timeout.unwrap();
        let next = manager.next_timeouts().base_timeout.unwrap();

        assert_eq!(utc("2021-11-11T09:00:00Z"), last.time);
        assert_eq!(utc("2021-11-11T10:00:00Z"), next.time);
        assert_eq!(last.rollup_number + 1, next.rollup_number);
    }

    #[test]
    fn sub_second_interval_disables_deadlines() {
        let manager = manager(
            0.5,
            vec![bridge_config(1, 2)],
            utc("2021-11-11T09:30:00Z"),
        );

        assert_eq!(RollupTimeouts::default(), manager.last_timeouts());
        assert_eq!(RollupTimeouts::default(), manager.next_timeouts());
    }

    #[test]
    fn bridge_boundaries_are_base_multiples() {
        let manager = manager(
            3_600.0,
            vec![bridge_config(1, 2), bridge_config(2, 3)],
            utc("2021-11-11T09:30:00Z"),
        );

        let last = manager.last_timeouts();
        let next = manager.next_timeouts();

        let last_b1 = last.bridge_timeouts[&U256::from(1u8)];
        assert_eq!(utc("2021-11-11T08:00:00Z"), last_b1.time);
        assert_eq!(
            utc("2021-11-11T10:00:00Z"),
            next.bridge_timeouts[&U256::from(1u8)].time
        );

        for timeouts in [&last, &next] {
            for timeout in timeouts.bridge_timeouts.values() {
                assert_eq!(0, timeout.time.timestamp() % 3_600);
            }
        }
    }

    #[test]
    fn low_frequency_bridges_are_not_tracked() {
        let manager = manager(
            3_600.0,
            vec![bridge_config(1, 0), bridge_config(2, -4), bridge_config(3, 1)],
            utc("2021-11-11T09:30:00Z"),
        );

        let timeouts = manager.last_timeouts();
        assert_eq!(1, timeouts.bridge_timeouts.len());
        assert!(timeouts.bridge_timeouts.contains_key(&U256::from(3u8)));
    }

    #[test]
    fn boundary_at_exact_tick_is_inclusive_of_last() {
        let manager = manager(3_600.0, vec![], utc("2021-11-11T10:00:00Z"));

        let last = manager.last_timeouts().base_timeout.unwrap();
        assert_eq!(utc("2021-11-11T10:00:00Z"), last.time);
    }
}
