use std::collections::VecDeque;

use alloy_primitives::U256;
use zkr_rollup_interface::{Timeout, TxFeeResolver, TxType};

use crate::resources::RollupResources;
use crate::rollup_tx::RollupTx;

/// Holding queue for the pending DeFi deposits of a single bridge. Decides
/// when the bridge's accumulated fees cover its fixed cost and therefore when
/// its transactions may enter a rollup.
///
/// Queues are rebuilt every tick from the freshly read pending set and the
/// tick's timeouts; they are not durable state.
#[derive(Debug)]
pub struct BridgeTxQueue {
    bridge_call_data: U256,
    bridge_gas: u64,
    timeout: Option<Timeout>,
    txs: VecDeque<RollupTx>,
    gas_accrued: u64,
}

/// Outcome of one [`BridgeTxQueue::txs_to_rollup`] call.
#[derive(Debug, Default)]
pub struct BridgeQueueResult {
    /// Transactions admitted into the rollup, in insertion order.
    pub txs: Vec<RollupTx>,
    /// Resources their admission consumed, including the bridge's one-shot
    /// gas if any transaction was admitted.
    pub resources: RollupResources,
}

impl BridgeTxQueue {
    /// An empty queue for `bridge_call_data`, whose interaction costs
    /// `bridge_gas`, deadlined at `timeout` if tracked.
    pub fn new(bridge_call_data: U256, bridge_gas: u64, timeout: Option<Timeout>) -> Self {
        Self {
            bridge_call_data,
            bridge_gas,
            timeout,
            txs: VecDeque::new(),
            gas_accrued: 0,
        }
    }

    /// The bridge this queue holds transactions for.
    pub fn bridge_call_data(&self) -> U256 {
        self.bridge_call_data
    }

    /// Gas accrued towards the bridge's fixed cost. Each transaction
    /// contributes its per-transaction bridge share plus its excess gas,
    /// clamped at the full bridge gas.
    pub fn gas_accrued(&self) -> u64 {
        self.gas_accrued
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether the queue holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Append a transaction and account its contribution.
    pub fn add(&mut self, tx: RollupTx, fee_resolver: &impl TxFeeResolver) {
        let share = fee_resolver.single_bridge_tx_gas(self.bridge_call_data);
        let contribution = share
            .saturating_add(tx.excess_gas().max(0) as u64)
            .min(self.bridge_gas);
        self.gas_accrued = self.gas_accrued.saturating_add(contribution);
        self.txs.push_back(tx);
    }

    /// Whether the transaction was submitted before the bridge's deadline
    /// boundary and is therefore overdue.
    pub fn transaction_has_timed_out(&self, tx: &RollupTx) -> bool {
        self.timeout.is_some_and(|timeout| tx.created() < timeout.time)
    }

    fn is_profitable(&self) -> bool {
        self.gas_accrued >= self.bridge_gas
    }

    fn is_deadlined(&self) -> bool {
        self.txs
            .front()
            .is_some_and(|tx| self.transaction_has_timed_out(tx))
    }

    /// The selection decision: if the bridge is profitable or deadlined,
    /// greedily admit queued transactions in insertion order while each
    /// candidate fits the remaining slots, asset-set room, gas and calldata.
    /// Admission stops at the first candidate that does not fit; none are
    /// skipped. The bridge's one-shot gas is charged with the first admitted
    /// transaction.
    pub fn txs_to_rollup(
        &mut self,
        fee_resolver: &impl TxFeeResolver,
        slots_remaining: usize,
        current_asset_ids: &[u32],
        max_assets: usize,
        gas_remaining: u64,
        call_data_remaining: u64,
    ) -> BridgeQueueResult {
        let mut result = BridgeQueueResult::default();
        if !self.is_profitable() && !self.is_deadlined() {
            return result;
        }

        let mut new_assets: Vec<u32> = Vec::new();
        let mut gas_used = 0u64;
        let mut call_data_used = 0u64;

        while result.txs.len() < slots_remaining {
            let Some(tx) = self.txs.front() else {
                break;
            };

            let asset_id = tx.fee_asset_id();
            let adds_asset = fee_resolver.is_fee_paying_asset(asset_id)
                && !current_asset_ids.contains(&asset_id)
                && !new_assets.contains(&asset_id);
            if adds_asset && current_asset_ids.len() + new_assets.len() == max_assets {
                break;
            }

            let bridge_gas_due = if result.txs.is_empty() {
                self.bridge_gas
            } else {
                0
            };
            let tx_gas = bridge_gas_due
                + fee_resolver
                    .tx_gas(asset_id, TxType::DefiDeposit)
                    .saturating_sub(fee_resolver.base_verification_gas());
            let tx_call_data = fee_resolver.tx_call_data(TxType::DefiDeposit);
            if gas_used + tx_gas > gas_remaining {
                break;
            }
            if call_data_used + tx_call_data > call_data_remaining {
                break;
            }

            gas_used += tx_gas;
            call_data_used += tx_call_data;
            if adds_asset {
                new_assets.push(asset_id);
            }
            if let Some(tx) = self.txs.pop_front() {
                result.txs.push(tx);
            }
        }

        if !result.txs.is_empty() {
            result.resources = RollupResources {
                gas_used,
                call_data_used,
                bridge_call_datas: vec![self.bridge_call_data],
                asset_ids: new_assets,
            };
        }
        result
    }
}
