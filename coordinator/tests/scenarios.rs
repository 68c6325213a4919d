//! End-to-end publication scenarios: the publish-time manager and the
//! coordinator wired together over mock collaborators, driven tick by tick
//! the way the sequencer pipeline drives them.

use alloy_primitives::{B256, U256};
use chrono::{DateTime, Utc};
use zkr_coordinator::{CoordinatorConfig, PublishTimeManager, RollupCoordinator, RollupProfile};
use zkr_rollup_interface::mocks::{
    FixedClock, MockBridgeResolver, MockRollupAggregator, MockRollupCreator, MockRollupPublisher,
    MockTxFeeResolver, TxBuilder,
};
use zkr_rollup_interface::{BridgeConfig, PendingTx, TxType};

const BASE_INTERVAL_SECS: f64 = 3_600.0;

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

struct Node {
    clock: FixedClock,
    publish_time: PublishTimeManager<MockBridgeResolver, FixedClock>,
    fees: MockTxFeeResolver,
    bridges: MockBridgeResolver,
    creator: MockRollupCreator,
    aggregator: MockRollupAggregator,
    publisher: MockRollupPublisher,
    config: CoordinatorConfig,
}

impl Node {
    fn new(bridge_configs: Vec<BridgeConfig>, fees: MockTxFeeResolver) -> Self {
        let clock = FixedClock::new(utc("2021-11-11T09:30:00Z"));
        let bridges = MockBridgeResolver::new(bridge_configs);
        let publish_time =
            PublishTimeManager::new(BASE_INTERVAL_SECS, bridges.clone(), clock.clone());
        Self {
            clock,
            publish_time,
            fees,
            bridges,
            creator: MockRollupCreator::default(),
            aggregator: MockRollupAggregator::default(),
            publisher: MockRollupPublisher::default(),
            config: CoordinatorConfig {
                num_inner_rollup_txs: 2,
                num_outer_rollup_proofs: 2,
                max_rollup_gas: 100_000_000,
                max_rollup_call_data: 1_000_000,
                publish_interval_secs: BASE_INTERVAL_SECS,
            },
        }
    }

    /// One pipeline iteration: fresh coordinator, current timeouts.
    async fn tick(&self, pending_txs: Vec<PendingTx>) -> RollupProfile {
        let coordinator = RollupCoordinator::new(
            self.config.clone(),
            self.creator.clone(),
            self.aggregator.clone(),
            self.publisher.clone(),
            self.fees.clone(),
            self.bridges.clone(),
            B256::ZERO,
        );
        let timeouts = self.publish_time.last_timeouts();
        coordinator
            .process_pending_txs(pending_txs, false, &timeouts)
            .await
            .unwrap()
    }
}

fn transfer_at(created: &str, excess_gas: i64) -> PendingTx {
    TxBuilder::new(TxType::Transfer)
        .excess_gas(excess_gas)
        .created(utc(created))
        .build()
}

fn defi_deposit_at(created: &str, bridge_call_data: u64, excess_gas: i64) -> PendingTx {
    TxBuilder::new(TxType::DefiDeposit)
        .bridge_call_data(U256::from(bridge_call_data))
        .excess_gas(excess_gas)
        .created(utc(created))
        .build()
}

#[tokio::test]
async fn deadline_forces_publication_of_a_single_unprofitable_payment() {
    let node = Node::new(Vec::new(), MockTxFeeResolver::default());
    let tx = transfer_at("2021-11-11T09:10:00Z", 0);

    // 09:30 tick: the last boundary is 09:00 and the tx is newer, so it waits.
    let profile = node.tick(vec![tx.clone()]).await;
    assert_eq!(1, profile.total_txs);
    assert!(profile.gas_balance < 0);
    assert!(!profile.published);
    assert!(node.publisher.published().is_empty());

    // 10:00 tick: the boundary has passed the tx; the deadline fires.
    node.clock.set(utc("2021-11-11T10:00:00Z"));
    let profile = node.tick(vec![tx]).await;
    assert!(profile.gas_balance < 0);
    assert!(profile.published);
    assert_eq!(1, node.publisher.published().len());
}

#[tokio::test]
async fn profitability_triggers_immediate_publication() {
    let node = Node::new(Vec::new(), MockTxFeeResolver::default());
    let txs: Vec<PendingTx> = (0..3)
        .map(|_| transfer_at("2021-11-11T09:10:00Z", 20_000))
        .collect();

    let profile = node.tick(txs).await;
    // Three txs at 20k excess against one empty slot at 10k base gas.
    assert_eq!(50_000, profile.gas_balance);
    assert!(profile.published);
    assert_eq!(1, node.publisher.published().len());
}

#[tokio::test]
async fn bridge_batches_wait_for_profitability_then_enter_in_bulk() {
    let bridge_call_data = 1u64;
    let bridge = BridgeConfig {
        bridge_call_data: U256::from(bridge_call_data),
        num_txs: 5,
        gas: 1_000_000,
        rollup_frequency: 2,
    };
    let fees =
        MockTxFeeResolver::default().with_bridge_gas(U256::from(bridge_call_data), 1_000_000, 0);
    let mut node = Node::new(vec![bridge], fees);
    node.config.num_outer_rollup_proofs = 4;

    let mut txs: Vec<PendingTx> = (0..4)
        .map(|_| defi_deposit_at("2021-11-11T09:10:00Z", bridge_call_data, 200_000))
        .collect();

    // 800k of 1M accrued: the bridge holds its txs back.
    let profile = node.tick(txs.clone()).await;
    assert_eq!(0, profile.total_txs);

    // The fifth tx tips the bridge over; all five enter one rollup.
    txs.push(defi_deposit_at("2021-11-11T09:10:00Z", bridge_call_data, 200_000));
    let profile = node.tick(txs).await;
    assert_eq!(5, profile.total_txs);
    assert_eq!(5, profile.bridge_profiles[0].num_txs);
    assert_eq!(1_000_000, profile.bridge_profiles[0].gas_accrued);
}

#[tokio::test]
async fn bridge_deadline_forces_out_a_short_batch() {
    let bridge_call_data = 1u64;
    let bridge = BridgeConfig {
        bridge_call_data: U256::from(bridge_call_data),
        num_txs: 5,
        gas: 1_000_000,
        rollup_frequency: 2,
    };
    let fees =
        MockTxFeeResolver::default().with_bridge_gas(U256::from(bridge_call_data), 1_000_000, 0);
    let node = Node::new(vec![bridge], fees);

    let txs: Vec<PendingTx> = (0..4)
        .map(|_| defi_deposit_at("2021-11-11T09:10:00Z", bridge_call_data, 200_000))
        .collect();

    let profile = node.tick(txs.clone()).await;
    assert!(!profile.published);

    // At 11:00 the bridge's two-hour boundary (10:00) has passed the txs.
    node.clock.set(utc("2021-11-11T11:00:00Z"));
    let profile = node.tick(txs).await;
    assert_eq!(4, profile.total_txs);
    assert!(profile.published);

    let rollup = &node.publisher.published()[0];
    assert_eq!(U256::from(bridge_call_data), rollup.bridge_call_datas[0]);
}
