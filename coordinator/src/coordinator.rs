use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use alloy_primitives::{B256, U256};
use anyhow::bail;
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};
use zkr_rollup_interface::{
    BridgeResolver, PendingTx, RollupAggregator, RollupCreator, RollupPublisher, RollupTimeouts,
    TxFeeResolver, TxType, NUMBER_OF_ASSETS, NUM_BRIDGE_CALLS_PER_BLOCK,
};

use crate::bridge_queue::BridgeTxQueue;
use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::metrics;
use crate::profile::{profile_rollup, RollupProfile};
use crate::resources::RollupResources;
use crate::rollup_tx::RollupTx;

/// Lifecycle of one coordinator tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Selecting transactions and building proofs. Interruptible.
    Building,
    /// Handing the aggregate proof to the settlement layer. Past the point
    /// of no return.
    Publishing,
    /// An interrupt was requested while building.
    Interrupted,
}

/// The batch scheduler: selects pending transactions under the rollup's
/// resource constraints, decides whether to publish, and drives the proving
/// pipeline when it does.
///
/// One coordinator serves one tick. The pipeline constructs a fresh instance
/// per iteration with a freshly read pending set; bridge queues and selection
/// state are never carried across ticks.
pub struct RollupCoordinator<Cr, Ag, Pb, Fr, Br> {
    rollup_creator: Cr,
    rollup_aggregator: Ag,
    rollup_publisher: Pb,
    fee_resolver: Fr,
    bridge_resolver: Br,
    config: CoordinatorConfig,
    old_defi_root: B256,
    state: Mutex<CoordinatorState>,
    interrupted: AtomicBool,
}

struct Selection {
    txs: Vec<RollupTx>,
    resources: RollupResources,
}

impl<Cr, Ag, Pb, Fr, Br> RollupCoordinator<Cr, Ag, Pb, Fr, Br>
where
    Cr: RollupCreator,
    Ag: RollupAggregator,
    Pb: RollupPublisher,
    Fr: TxFeeResolver,
    Br: BridgeResolver,
{
    /// Creates a coordinator for one tick.
    pub fn new(
        config: CoordinatorConfig,
        rollup_creator: Cr,
        rollup_aggregator: Ag,
        rollup_publisher: Pb,
        fee_resolver: Fr,
        bridge_resolver: Br,
        old_defi_root: B256,
    ) -> Self {
        Self {
            rollup_creator,
            rollup_aggregator,
            rollup_publisher,
            fee_resolver,
            bridge_resolver,
            config,
            old_defi_root,
            state: Mutex::new(CoordinatorState::Building),
            interrupted: AtomicBool::new(false),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.lock().expect("Lock was poisoned")
    }

    /// Request a cooperative stop. The flag is observed at the next
    /// checkpoint; in-flight proof work is asked to tear down as well.
    ///
    /// Once the coordinator has started publishing the call has no effect;
    /// it errors instead when `should_throw_if_fail_to_stop` is set.
    pub fn interrupt(&self, should_throw_if_fail_to_stop: bool) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("Lock was poisoned");
        if *state != CoordinatorState::Building {
            if should_throw_if_fail_to_stop {
                bail!("rollup coordinator is already publishing, cannot stop");
            }
            return Ok(());
        }
        *state = CoordinatorState::Interrupted;
        self.interrupted.store(true, Ordering::SeqCst);
        self.rollup_creator.interrupt();
        self.rollup_aggregator.interrupt();
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), CoordinatorError> {
        if self.interrupted.load(Ordering::SeqCst) {
            Err(CoordinatorError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Run one tick over a snapshot of the pending pool: select a batch,
    /// decide whether to publish, and if so prove, aggregate and hand it to
    /// the settlement layer.
    ///
    /// Collaborator failures abandon the batch and are not rethrown; the
    /// returned profile then reports `published = false` and the pending
    /// transactions are reselected next tick. [`CoordinatorError::Interrupted`]
    /// signals a normal shutdown.
    pub async fn process_pending_txs(
        &self,
        pending_txs: Vec<PendingTx>,
        flush: bool,
        timeouts: &RollupTimeouts,
    ) -> Result<RollupProfile, CoordinatorError> {
        let total_slots = self.config.total_slots();
        debug!(num_pending = pending_txs.len(), flush, "processing pending txs");

        let selection = self.select_txs(pending_txs, flush, timeouts);
        if selection.txs.len() > total_slots {
            return Err(CoordinatorError::InvariantViolated(format!(
                "selected {} txs for {} slots",
                selection.txs.len(),
                total_slots
            )));
        }
        self.checkpoint()?;

        let mut profile = profile_rollup(
            &selection.txs,
            &selection.resources,
            &self.fee_resolver,
            total_slots,
            self.config.num_inner_rollup_txs,
        );

        match self.publish_reason(&profile, &selection.txs, timeouts, flush) {
            Some(reason) if profile.total_txs > 0 => {
                info!(reason, total_txs = profile.total_txs, "publishing rollup");
                let publish_started = Instant::now();
                match self.aggregate_and_publish(&selection).await {
                    Ok(accepted) => {
                        profile.published = accepted;
                        metrics::PUBLISH_LATENCY_SECONDS
                            .observe(publish_started.elapsed().as_secs_f64());
                        if !accepted {
                            warn!("settlement layer did not accept the rollup");
                        }
                    }
                    Err(CoordinatorError::Collaborator(error)) => {
                        error!(%error, "rollup abandoned, pending txs will be reselected");
                    }
                    Err(other) => return Err(other),
                }
            }
            _ => {
                debug!(
                    total_txs = profile.total_txs,
                    gas_balance = profile.gas_balance,
                    "conditions not met, holding batch"
                );
            }
        }

        profile.log(&self.bridge_resolver);
        metrics::record_profile(&profile);
        Ok(profile)
    }

    fn tx_gas_delta(&self, tx: &RollupTx) -> u64 {
        self.fee_resolver
            .tx_gas(tx.fee_asset_id(), tx.tx_type())
            .saturating_sub(self.fee_resolver.base_verification_gas())
    }

    fn fits(&self, resources: &RollupResources, gas: u64, call_data: u64) -> bool {
        resources.gas_used.saturating_add(gas) <= self.config.max_rollup_gas
            && resources.call_data_used.saturating_add(call_data)
                <= self.config.max_rollup_call_data
    }

    fn select_txs(
        &self,
        pending_txs: Vec<PendingTx>,
        flush: bool,
        timeouts: &RollupTimeouts,
    ) -> Selection {
        let total_slots = self.config.total_slots();

        let mut txs = Vec::with_capacity(pending_txs.len());
        for tx in pending_txs {
            match RollupTx::new(tx) {
                Ok(tx) => txs.push(tx),
                Err(error) => warn!(%error, "ignoring tx with malformed bridge call data"),
            }
        }

        // Claims unblock user funds; bring them to the front, keeping
        // submission order within each group.
        let (claims, rest): (Vec<_>, Vec<_>) = txs
            .into_iter()
            .partition(|tx| tx.tx_type() == TxType::DefiClaim);

        let mut selection = Selection {
            txs: Vec::new(),
            resources: RollupResources::new(
                total_slots as u64 * self.fee_resolver.base_verification_gas(),
            ),
        };
        let mut discarded_commitments: HashSet<B256> = HashSet::new();
        let mut bridge_queues: HashMap<U256, BridgeTxQueue> = HashMap::new();

        for tx in claims.into_iter().chain(rest) {
            if selection.txs.len() == total_slots {
                break;
            }

            if tx.tx_type() == TxType::Account {
                // Fee-less and commitment-free as far as chaining is
                // concerned: skipped rather than discarded when it does not
                // fit.
                let gas = self.tx_gas_delta(&tx);
                let call_data = self.fee_resolver.tx_call_data(tx.tx_type());
                if self.fits(&selection.resources, gas, call_data) {
                    selection.resources.gas_used += gas;
                    selection.resources.call_data_used += call_data;
                    selection.txs.push(tx);
                }
                continue;
            }

            let asset_id = tx.fee_asset_id();
            if self.fee_resolver.is_fee_paying_asset(asset_id)
                && !selection.resources.has_asset(asset_id)
                && selection.resources.asset_ids.len() == NUMBER_OF_ASSETS
            {
                discard(&mut discarded_commitments, &tx, "asset set saturated");
                continue;
            }

            if let Some(link) = tx.backward_link() {
                if discarded_commitments.contains(&link) {
                    discard(&mut discarded_commitments, &tx, "chains off a discarded tx");
                    continue;
                }
            }

            if tx.tx_type() == TxType::DefiDeposit {
                self.add_defi_tx(tx, flush, timeouts, &mut selection, &mut bridge_queues);
            } else {
                let gas = self.tx_gas_delta(&tx);
                let call_data = self.fee_resolver.tx_call_data(tx.tx_type());
                if !self.fits(&selection.resources, gas, call_data) {
                    discard(&mut discarded_commitments, &tx, "resource limits");
                    continue;
                }
                selection.resources.gas_used += gas;
                selection.resources.call_data_used += call_data;
                if self.fee_resolver.is_fee_paying_asset(asset_id) {
                    selection.resources.add_asset(asset_id);
                }
                selection.txs.push(tx);
            }
        }

        selection
    }

    fn add_defi_tx(
        &self,
        tx: RollupTx,
        flush: bool,
        timeouts: &RollupTimeouts,
        selection: &mut Selection,
        bridge_queues: &mut HashMap<U256, BridgeTxQueue>,
    ) {
        let Some(bridge_call_data) = tx.encoded_bridge_call_data() else {
            warn!(tx_id = %tx.inner().id, "defi deposit without bridge call data");
            return;
        };

        if selection.resources.has_bridge(bridge_call_data) {
            // The bridge already pays its way in this batch; only this tx's
            // own resources are at stake. Left in the pending pool when it
            // does not fit.
            self.try_add_single_defi(tx, 0, selection);
            return;
        }

        if selection.resources.bridge_call_datas.len() == NUM_BRIDGE_CALLS_PER_BLOCK {
            debug!(%bridge_call_data, "all bridge slots taken");
            return;
        }

        let bridge_gas = self.fee_resolver.full_bridge_gas(bridge_call_data);
        if flush {
            self.try_add_single_defi(tx, bridge_gas, selection);
            return;
        }

        let queue = bridge_queues.entry(bridge_call_data).or_insert_with(|| {
            BridgeTxQueue::new(
                bridge_call_data,
                bridge_gas,
                timeouts.bridge_timeouts.get(&bridge_call_data).copied(),
            )
        });

        if queue.transaction_has_timed_out(&tx) {
            self.try_add_single_defi(tx, bridge_gas, selection);
            return;
        }

        queue.add(tx, &self.fee_resolver);
        let result = queue.txs_to_rollup(
            &self.fee_resolver,
            self.config.total_slots() - selection.txs.len(),
            &selection.resources.asset_ids,
            NUMBER_OF_ASSETS,
            self.config
                .max_rollup_gas
                .saturating_sub(selection.resources.gas_used),
            self.config
                .max_rollup_call_data
                .saturating_sub(selection.resources.call_data_used),
        );
        if !result.txs.is_empty() {
            debug!(
                %bridge_call_data,
                num_txs = result.txs.len(),
                "bridge queue entered the rollup"
            );
            selection.txs.extend(result.txs);
            selection.resources.merge(result.resources);
        }
    }

    fn try_add_single_defi(&self, tx: RollupTx, bridge_gas_due: u64, selection: &mut Selection) {
        let Some(bridge_call_data) = tx.encoded_bridge_call_data() else {
            return;
        };

        let asset_id = tx.fee_asset_id();
        if self.fee_resolver.is_fee_paying_asset(asset_id)
            && !selection.resources.has_asset(asset_id)
            && selection.resources.asset_ids.len() == NUMBER_OF_ASSETS
        {
            return;
        }

        let gas = bridge_gas_due + self.tx_gas_delta(&tx);
        let call_data = self.fee_resolver.tx_call_data(tx.tx_type());
        if !self.fits(&selection.resources, gas, call_data) {
            return;
        }

        selection.resources.gas_used += gas;
        selection.resources.call_data_used += call_data;
        selection.resources.add_bridge(bridge_call_data);
        if self.fee_resolver.is_fee_paying_asset(asset_id) {
            selection.resources.add_asset(asset_id);
        }
        selection.txs.push(tx);
    }

    fn publish_reason(
        &self,
        profile: &RollupProfile,
        txs: &[RollupTx],
        timeouts: &RollupTimeouts,
        flush: bool,
    ) -> Option<&'static str> {
        if flush {
            return Some("flush");
        }
        if profile.gas_balance >= 0 {
            return Some("profitable");
        }
        if let Some(base) = timeouts.base_timeout {
            if txs
                .iter()
                .any(|tx| tx.tx_type() != TxType::DefiDeposit && tx.created() < base.time)
            {
                return Some("base deadline");
            }
        }
        for bridge in &profile.bridge_profiles {
            if bridge.num_txs == 0 {
                continue;
            }
            if let Some(timeout) = timeouts.bridge_timeouts.get(&bridge.bridge_call_data) {
                if bridge.earliest_tx < timeout.time {
                    return Some("bridge deadline");
                }
            }
        }
        if self.config.max_rollup_gas.saturating_sub(profile.total_gas)
            < self.fee_resolver.max_unadjusted_gas()
        {
            return Some("out of gas");
        }
        if self
            .config
            .max_rollup_call_data
            .saturating_sub(profile.total_call_data)
            < self.fee_resolver.max_tx_call_data()
        {
            return Some("out of call data");
        }
        if profile.total_txs == self.config.total_slots() {
            return Some("out of slots");
        }
        None
    }

    async fn aggregate_and_publish(&self, selection: &Selection) -> Result<bool, CoordinatorError> {
        let records: Vec<PendingTx> = selection.txs.iter().map(|tx| tx.inner().clone()).collect();
        let chunks: Vec<&[PendingTx]> = records.chunks(self.config.num_inner_rollup_txs).collect();

        // Inner circuits mutate the shared Merkle state and are built
        // strictly in order.
        let mut circuit_inputs = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let input = self
                .rollup_creator
                .create_rollup(
                    chunk,
                    &selection.resources.bridge_call_datas,
                    &selection.resources.asset_ids,
                    i == 0,
                )
                .await?;
            circuit_inputs.push(input);
        }

        // Inner proofs are pure functions of their circuit inputs.
        let inner_proofs = try_join_all(
            chunks
                .iter()
                .zip(circuit_inputs)
                .map(|(chunk, input)| self.rollup_creator.create_proof(chunk, input)),
        )
        .await?;

        let mut padded_bridge_call_datas = selection.resources.bridge_call_datas.clone();
        padded_bridge_call_datas.resize(NUM_BRIDGE_CALLS_PER_BLOCK, U256::ZERO);

        let rollup = self
            .rollup_aggregator
            .aggregate_rollup_proofs(
                inner_proofs,
                self.old_defi_root,
                &padded_bridge_call_datas,
                &selection.resources.asset_ids,
            )
            .await?;

        self.checkpoint()?;
        *self.state.lock().expect("Lock was poisoned") = CoordinatorState::Publishing;

        info!(rollup_id = rollup.rollup_id, "submitting rollup");
        let accepted = self
            .rollup_publisher
            .publish_rollup(&rollup, selection.resources.gas_used)
            .await?;
        Ok(accepted)
    }
}

fn discard(discarded_commitments: &mut HashSet<B256>, tx: &RollupTx, reason: &str) {
    debug!(tx_id = %tx.inner().id, reason, "discarding tx from batch");
    for commitment in tx.note_commitments() {
        discarded_commitments.insert(commitment);
    }
}
