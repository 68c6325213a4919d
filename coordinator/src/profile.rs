use std::collections::HashMap;

use alloy_primitives::{B256, U256};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use zkr_rollup_interface::{BridgeResolver, TxFeeResolver, TxType};

use crate::resources::RollupResources;
use crate::rollup_tx::RollupTx;

/// Fee-recovery summary for one bridge in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeProfile {
    /// The bridge interaction.
    pub bridge_call_data: U256,
    /// Gas accrued towards the fixed cost by the batch's transactions.
    pub gas_accrued: u64,
    /// The fixed cost to recover.
    pub gas_threshold: u64,
    /// Number of the batch's transactions bound for this bridge.
    pub num_txs: usize,
    /// Submission time of the oldest such transaction.
    pub earliest_tx: DateTime<Utc>,
    /// Submission time of the newest such transaction.
    pub latest_tx: DateTime<Utc>,
}

/// Summary of one selection outcome, computed whether or not the batch is
/// published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupProfile {
    /// Whether the batch was accepted by the settlement layer this tick.
    pub published: bool,
    /// Transactions selected.
    pub total_txs: usize,
    /// Slot capacity of the rollup shape.
    pub rollup_size: usize,
    /// Settlement-layer gas the batch would consume, including the reserved
    /// verification gas of unfilled slots.
    pub total_gas: u64,
    /// Settlement-layer calldata the batch would consume.
    pub total_call_data: u64,
    /// Fees collected above cost, in gas units. Non-negative means the batch
    /// pays for itself.
    pub gas_balance: i64,
    /// Selected transactions chaining off a commitment in the same inner
    /// rollup.
    pub inner_chains: usize,
    /// Selected transactions chaining off a commitment in an earlier inner
    /// rollup of the same batch.
    pub outer_chains: usize,
    /// Selected transaction counts indexed by [`TxType::index`].
    pub num_txs_per_type: [usize; TxType::COUNT],
    /// Per-bridge fee recovery, in bridge admission order.
    pub bridge_profiles: Vec<BridgeProfile>,
}

impl RollupProfile {
    /// Emit the profile to the log, one line per bridge.
    pub fn log(&self, bridge_resolver: &impl BridgeResolver) {
        info!(
            published = self.published,
            total_txs = self.total_txs,
            rollup_size = self.rollup_size,
            total_gas = self.total_gas,
            total_call_data = self.total_call_data,
            gas_balance = self.gas_balance,
            inner_chains = self.inner_chains,
            outer_chains = self.outer_chains,
            "rollup profile"
        );
        for (tx_type, count) in TxType::all().into_iter().zip(self.num_txs_per_type) {
            if count > 0 {
                debug!(%tx_type, count, "selected txs");
            }
        }
        for bridge in &self.bridge_profiles {
            let description = bridge_resolver
                .bridge_description(bridge.bridge_call_data)
                .unwrap_or_else(|| bridge.bridge_call_data.to_string());
            debug!(
                bridge = %description,
                num_txs = bridge.num_txs,
                gas_accrued = bridge.gas_accrued,
                gas_threshold = bridge.gas_threshold,
                "bridge profile"
            );
        }
    }
}

/// Compute the profile of a selection outcome.
///
/// The gas balance credits every selected transaction's excess gas and each
/// bridge's fixed-cost recovery from per-transaction shares, and debits the
/// unrecovered bridge gas plus the reserved verification gas of unfilled
/// slots.
pub(crate) fn profile_rollup(
    txs: &[RollupTx],
    resources: &RollupResources,
    fee_resolver: &impl TxFeeResolver,
    total_slots: usize,
    num_inner_rollup_txs: usize,
) -> RollupProfile {
    let mut num_txs_per_type = [0usize; TxType::COUNT];
    for tx in txs {
        num_txs_per_type[tx.tx_type().index()] += 1;
    }

    let excess: i64 = txs.iter().map(RollupTx::excess_gas).sum();

    let mut bridge_profiles = Vec::with_capacity(resources.bridge_call_datas.len());
    let mut outstanding_bridge_gas: i64 = 0;
    for &bridge_call_data in &resources.bridge_call_datas {
        let gas_threshold = fee_resolver.full_bridge_gas(bridge_call_data);
        let share = fee_resolver.single_bridge_tx_gas(bridge_call_data);

        let mut gas_accrued = 0u64;
        let mut num_txs = 0usize;
        let mut earliest_tx: Option<DateTime<Utc>> = None;
        let mut latest_tx: Option<DateTime<Utc>> = None;
        for tx in txs {
            if tx.encoded_bridge_call_data() != Some(bridge_call_data) {
                continue;
            }
            num_txs += 1;
            gas_accrued = gas_accrued.saturating_add(
                share
                    .saturating_add(tx.excess_gas().max(0) as u64)
                    .min(gas_threshold),
            );
            let created = tx.created();
            earliest_tx = Some(earliest_tx.map_or(created, |t| t.min(created)));
            latest_tx = Some(latest_tx.map_or(created, |t| t.max(created)));
        }

        let recovered = (share * num_txs as u64).min(gas_threshold);
        outstanding_bridge_gas += (gas_threshold - recovered) as i64;

        let fallback = DateTime::<Utc>::UNIX_EPOCH;
        bridge_profiles.push(BridgeProfile {
            bridge_call_data,
            gas_accrued,
            gas_threshold,
            num_txs,
            earliest_tx: earliest_tx.unwrap_or(fallback),
            latest_tx: latest_tx.unwrap_or(fallback),
        });
    }

    let empty_slots = total_slots.saturating_sub(txs.len());
    let empty_slot_gas = empty_slots as i64 * fee_resolver.base_verification_gas() as i64;
    let gas_balance = excess - outstanding_bridge_gas - empty_slot_gas;

    let (inner_chains, outer_chains) = count_chains(txs, num_inner_rollup_txs);

    RollupProfile {
        published: false,
        total_txs: txs.len(),
        rollup_size: total_slots,
        total_gas: resources.gas_used,
        total_call_data: resources.call_data_used,
        gas_balance,
        inner_chains,
        outer_chains,
        num_txs_per_type,
        bridge_profiles,
    }
}

fn count_chains(txs: &[RollupTx], num_inner_rollup_txs: usize) -> (usize, usize) {
    let mut commitment_chunk: HashMap<B256, usize> = HashMap::new();
    let mut inner_chains = 0;
    let mut outer_chains = 0;
    for (i, tx) in txs.iter().enumerate() {
        let chunk = i / num_inner_rollup_txs.max(1);
        if let Some(link) = tx.backward_link() {
            match commitment_chunk.get(&link) {
                Some(&source_chunk) if source_chunk == chunk => inner_chains += 1,
                Some(_) => outer_chains += 1,
                None => {}
            }
        }
        for commitment in tx.note_commitments() {
            commitment_chunk.entry(commitment).or_insert(chunk);
        }
    }
    (inner_chains, outer_chains)
}

#[cfg(test)]
mod tests {
    use zkr_rollup_interface::mocks::{MockTxFeeResolver, TxBuilder};

    use super::*;

    fn fees() -> MockTxFeeResolver {
        MockTxFeeResolver::default()
            .with_base_verification_gas(10_000)
            .with_tx_gas(12_000)
            .with_tx_call_data(100)
    }

    fn transfer(excess_gas: i64) -> RollupTx {
        RollupTx::new(TxBuilder::new(TxType::Transfer).excess_gas(excess_gas).build()).unwrap()
    }

    #[test]
    fn empty_slots_cost_base_verification_gas() {
        let fees = fees();
        let txs = vec![transfer(0), transfer(0)];
        let resources = RollupResources::new(4 * 10_000 + 2 * 2_000);

        let profile = profile_rollup(&txs, &resources, &fees, 4, 2);
        assert_eq!(-20_000, profile.gas_balance);
        assert_eq!(2, profile.total_txs);
        assert_eq!(4, profile.rollup_size);
    }

    #[test]
    fn excess_gas_offsets_empty_slots() {
        let fees = fees();
        let txs = vec![transfer(15_000), transfer(15_000), transfer(0)];
        let resources = RollupResources::new(0);

        let profile = profile_rollup(&txs, &resources, &fees, 4, 2);
        // 30_000 excess against one empty slot at 10_000.
        assert_eq!(20_000, profile.gas_balance);
    }

    #[test]
    fn unrecovered_bridge_gas_counts_against_balance() {
        let bcd = U256::from(1u8);
        let fees = fees().with_bridge_gas(bcd, 1_000_000, 200_000);
        let txs: Vec<RollupTx> = (0..2)
            .map(|_| {
                RollupTx::new(
                    TxBuilder::new(TxType::DefiDeposit)
                        .bridge_call_data(bcd)
                        .excess_gas(50_000)
                        .build(),
                )
                .unwrap()
            })
            .collect();
        let mut resources = RollupResources::new(0);
        resources.add_bridge(bcd);

        let profile = profile_rollup(&txs, &resources, &fees, 2, 2);
        // 100_000 excess minus 600_000 still outstanding on the bridge.
        assert_eq!(-500_000, profile.gas_balance);

        let bridge = &profile.bridge_profiles[0];
        assert_eq!(2, bridge.num_txs);
        assert_eq!(2 * 250_000, bridge.gas_accrued);
        assert_eq!(1_000_000, bridge.gas_threshold);
    }

    #[test]
    fn chain_counts_distinguish_inner_and_outer() {
        let t1 = transfer(0);
        let t2 = RollupTx::new(
            TxBuilder::new(TxType::Transfer)
                .backward_link(t1.note_commitments()[0])
                .build(),
        )
        .unwrap();
        let t3 = RollupTx::new(
            TxBuilder::new(TxType::Transfer)
                .backward_link(t2.note_commitments()[1])
                .build(),
        )
        .unwrap();
        // t1, t2 share an inner rollup of two; t3 lands in the next one.
        let txs = vec![t1, t2, t3];
        let resources = RollupResources::new(0);

        let profile = profile_rollup(&txs, &resources, &fees(), 4, 2);
        assert_eq!(1, profile.inner_chains);
        assert_eq!(1, profile.outer_chains);
    }

    #[test]
    fn per_type_counts_follow_selection() {
        let fees = fees();
        let txs = vec![
            transfer(0),
            RollupTx::new(TxBuilder::new(TxType::DefiClaim).build()).unwrap(),
            transfer(0),
        ];
        let resources = RollupResources::new(0);

        let profile = profile_rollup(&txs, &resources, &fees, 4, 2);
        assert_eq!(2, profile.num_txs_per_type[TxType::Transfer.index()]);
        assert_eq!(1, profile.num_txs_per_type[TxType::DefiClaim.index()]);
        assert_eq!(0, profile.num_txs_per_type[TxType::Deposit.index()]);
    }
}
