//! Traits the coordinator uses to talk to its collaborators. Any
//! implementation satisfying these contracts suffices; the node wires
//! concrete instances in at construction time.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bridge::BridgeConfig;
use crate::tx::{PendingTx, TxId};

/// The bridge configuration registry.
pub trait BridgeResolver: Send + Sync {
    /// The currently registered bridge configurations.
    fn bridge_configs(&self) -> Vec<BridgeConfig>;

    /// Human-readable description of a bridge interaction, if known. Used
    /// only for logs and profiles.
    fn bridge_description(&self, bridge_call_data: U256) -> Option<String>;
}

/// Witness data for one inner rollup circuit. Opaque to the coordinator;
/// produced by [`RollupCreator::create_rollup`] and consumed by
/// [`RollupCreator::create_proof`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitInput(
    /// Serialized witness bytes.
    pub Vec<u8>,
);

/// A proven inner rollup. Opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerProof(
    /// Serialized proof bytes.
    pub Vec<u8>,
);

/// An aggregated rollup ready for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupDao {
    /// Monotonically increasing rollup number. No two published rollups
    /// share an id.
    pub rollup_id: u64,
    /// Bridge call data vector, right-padded with zeroes to
    /// [`NUM_BRIDGE_CALLS_PER_BLOCK`](crate::constants::NUM_BRIDGE_CALLS_PER_BLOCK).
    pub bridge_call_datas: Vec<U256>,
    /// Fee-paying assets settled by this rollup, in admission order.
    pub asset_ids: Vec<u32>,
    /// The aggregate proof bytes.
    pub proof_data: Vec<u8>,
}

/// Builds inner rollup circuits and proves them.
///
/// `create_rollup` mutates the shared Merkle world state and must be called
/// strictly sequentially; `create_proof` is a pure function of its circuit
/// input and may run concurrently with other proofs.
#[async_trait]
pub trait RollupCreator: Send + Sync {
    /// Build the circuit input for one inner rollup over `txs`.
    async fn create_rollup(
        &self,
        txs: &[PendingTx],
        bridge_call_datas: &[U256],
        asset_ids: &[u32],
        is_first: bool,
    ) -> anyhow::Result<CircuitInput>;

    /// Produce the SNARK proof for a previously built circuit input.
    async fn create_proof(
        &self,
        txs: &[PendingTx],
        circuit_input: CircuitInput,
    ) -> anyhow::Result<InnerProof>;

    /// Ask in-flight circuit or proof work to stop at its next opportunity.
    fn interrupt(&self);
}

/// Aggregates inner proofs into the outer rollup proof.
#[async_trait]
pub trait RollupAggregator: Send + Sync {
    /// Aggregate `inner_proofs` into a publishable rollup.
    async fn aggregate_rollup_proofs(
        &self,
        inner_proofs: Vec<InnerProof>,
        old_defi_root: B256,
        padded_bridge_call_datas: &[U256],
        asset_ids: &[u32],
    ) -> anyhow::Result<RollupDao>;

    /// Ask in-flight aggregation work to stop at its next opportunity.
    fn interrupt(&self);
}

/// Publishes aggregated rollups on the settlement layer.
#[async_trait]
pub trait RollupPublisher: Send + Sync {
    /// Submit the rollup. Returns `Ok(true)` once the settlement layer has
    /// accepted it, `Ok(false)` if it was not accepted.
    async fn publish_rollup(&self, rollup: &RollupDao, estimated_gas: u64) -> anyhow::Result<bool>;
}

/// The persistent pending-transaction store.
#[async_trait]
pub trait RollupDb: Send + Sync {
    /// Snapshot of the pending transactions, in submission order.
    async fn pending_txs(&self) -> anyhow::Result<Vec<PendingTx>>;

    /// Delete the given transactions in one batch.
    async fn delete_txs(&self, ids: &[TxId]) -> anyhow::Result<()>;
}

/// Read access to the global nullifier set of the settled chain.
#[async_trait]
pub trait NullifierView: Send + Sync {
    /// Whether the nullifier is present in the settled spent set.
    async fn is_spent(&self, nullifier: B256) -> anyhow::Result<bool>;
}

/// Read access to on-chain pending deposit balances.
#[async_trait]
pub trait PendingDepositView: Send + Sync {
    /// Funds the owner has escrowed on-chain for the asset, not yet claimed
    /// by any settled deposit.
    async fn pending_deposit(&self, asset_id: u32, owner: Address) -> anyhow::Result<U256>;
}
