//! Deterministic mock implementations of every collaborator trait, useful
//! for testing the coordinator without a proving backend or a chain.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, U256};
use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::bridge::BridgeConfig;
use crate::fees::TxFeeResolver;
use crate::services::{
    BridgeResolver, CircuitInput, InnerProof, NullifierView, PendingDepositView, RollupAggregator,
    RollupCreator, RollupDao, RollupDb, RollupPublisher,
};
use crate::time::Clock;
use crate::tx::{PendingTx, TxId, TxType};

static NEXT_FIXTURE_NONCE: AtomicU64 = AtomicU64::new(1);

fn b256_from_u64(value: u64) -> B256 {
    B256::new(U256::from(value).to_be_bytes())
}

/// Builder of [`PendingTx`] fixtures with unique ids, commitments and
/// nullifiers drawn from a process-wide counter.
pub struct TxBuilder {
    tx: PendingTx,
}

impl TxBuilder {
    /// Start a fixture of the given kind.
    pub fn new(tx_type: TxType) -> Self {
        let nonce = NEXT_FIXTURE_NONCE.fetch_add(1, Ordering::Relaxed);
        let tx = PendingTx {
            id: TxId(b256_from_u64(nonce).0),
            tx_type,
            note_commitment1: b256_from_u64(nonce << 16 | 1),
            note_commitment2: b256_from_u64(nonce << 16 | 2),
            nullifier1: b256_from_u64(nonce << 16 | 3),
            nullifier2: b256_from_u64(nonce << 16 | 4),
            backward_link: B256::ZERO,
            public_value: U256::ZERO,
            public_owner: Address::ZERO,
            fee_asset_id: 0,
            fee_value: U256::ZERO,
            bridge_call_data: None,
            created: DateTime::<Utc>::UNIX_EPOCH,
            excess_gas: 0,
        };
        Self { tx }
    }

    /// Set the submission time.
    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.tx.created = created;
        self
    }

    /// Set the excess gas paid above the minimum quote.
    pub fn excess_gas(mut self, excess_gas: i64) -> Self {
        self.tx.excess_gas = excess_gas;
        self
    }

    /// Set the fee asset.
    pub fn fee_asset_id(mut self, fee_asset_id: u32) -> Self {
        self.tx.fee_asset_id = fee_asset_id;
        self
    }

    /// Set the encoded bridge call data (DeFi deposits).
    pub fn bridge_call_data(mut self, bridge_call_data: U256) -> Self {
        self.tx.bridge_call_data = Some(bridge_call_data);
        self
    }

    /// Chain this fixture off a predecessor note commitment.
    pub fn backward_link(mut self, commitment: B256) -> Self {
        self.tx.backward_link = commitment;
        self
    }

    /// Set the public value (deposits and withdrawals).
    pub fn public_value(mut self, value: U256) -> Self {
        self.tx.public_value = value;
        self
    }

    /// Set the settlement-layer owner of the public value.
    pub fn public_owner(mut self, owner: Address) -> Self {
        self.tx.public_owner = owner;
        self
    }

    /// Zero both nullifiers (proofs that spend no input notes).
    pub fn no_nullifiers(mut self) -> Self {
        self.tx.nullifier1 = B256::ZERO;
        self.tx.nullifier2 = B256::ZERO;
        self
    }

    /// Finish the fixture.
    pub fn build(self) -> PendingTx {
        self.tx
    }
}

/// [`Clock`] returning a programmable instant.
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// A clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Move the clock to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// [`BridgeResolver`] serving a fixed configuration set.
#[derive(Clone, Default)]
pub struct MockBridgeResolver {
    configs: Vec<BridgeConfig>,
}

impl MockBridgeResolver {
    /// A resolver serving exactly `configs`.
    pub fn new(configs: Vec<BridgeConfig>) -> Self {
        Self { configs }
    }
}

impl BridgeResolver for MockBridgeResolver {
    fn bridge_configs(&self) -> Vec<BridgeConfig> {
        self.configs.clone()
    }

    fn bridge_description(&self, bridge_call_data: U256) -> Option<String> {
        self.configs
            .iter()
            .find(|c| c.bridge_call_data == bridge_call_data)
            .map(|_| format!("mock bridge {bridge_call_data}"))
    }
}

/// [`TxFeeResolver`] with flat, programmable quotes.
#[derive(Clone)]
pub struct MockTxFeeResolver {
    base_verification_gas: u64,
    tx_gas: u64,
    tx_gas_overrides: HashMap<TxType, u64>,
    tx_call_data: u64,
    single_bridge_tx_gas: HashMap<U256, u64>,
    full_bridge_gas: HashMap<U256, u64>,
    non_fee_paying_assets: HashSet<u32>,
}

impl Default for MockTxFeeResolver {
    fn default() -> Self {
        Self {
            base_verification_gas: 10_000,
            tx_gas: 12_000,
            tx_gas_overrides: HashMap::new(),
            tx_call_data: 100,
            single_bridge_tx_gas: HashMap::new(),
            full_bridge_gas: HashMap::new(),
            non_fee_paying_assets: HashSet::new(),
        }
    }
}

impl MockTxFeeResolver {
    /// Override the per-slot base verification gas.
    pub fn with_base_verification_gas(mut self, gas: u64) -> Self {
        self.base_verification_gas = gas;
        self
    }

    /// Override the flat unadjusted per-transaction gas.
    pub fn with_tx_gas(mut self, gas: u64) -> Self {
        self.tx_gas = gas;
        self
    }

    /// Override the unadjusted gas for one transaction kind only.
    pub fn with_tx_gas_for(mut self, tx_type: TxType, gas: u64) -> Self {
        self.tx_gas_overrides.insert(tx_type, gas);
        self
    }

    /// Override the flat per-transaction calldata.
    pub fn with_tx_call_data(mut self, call_data: u64) -> Self {
        self.tx_call_data = call_data;
        self
    }

    /// Quote a bridge: full fixed gas and the per-transaction share.
    pub fn with_bridge_gas(mut self, bridge_call_data: U256, full: u64, single: u64) -> Self {
        self.full_bridge_gas.insert(bridge_call_data, full);
        self.single_bridge_tx_gas.insert(bridge_call_data, single);
        self
    }

    /// Mark an asset as not accepted for fee payment.
    pub fn with_non_fee_paying_asset(mut self, asset_id: u32) -> Self {
        self.non_fee_paying_assets.insert(asset_id);
        self
    }
}

impl TxFeeResolver for MockTxFeeResolver {
    fn base_verification_gas(&self) -> u64 {
        self.base_verification_gas
    }

    fn tx_gas(&self, _fee_asset_id: u32, tx_type: TxType) -> u64 {
        self.tx_gas_overrides
            .get(&tx_type)
            .copied()
            .unwrap_or(self.tx_gas)
    }

    fn tx_call_data(&self, _tx_type: TxType) -> u64 {
        self.tx_call_data
    }

    fn single_bridge_tx_gas(&self, bridge_call_data: U256) -> u64 {
        self.single_bridge_tx_gas
            .get(&bridge_call_data)
            .copied()
            .unwrap_or(0)
    }

    fn full_bridge_gas(&self, bridge_call_data: U256) -> u64 {
        self.full_bridge_gas
            .get(&bridge_call_data)
            .copied()
            .unwrap_or(1_000_000)
    }

    fn is_fee_paying_asset(&self, asset_id: u32) -> bool {
        !self.non_fee_paying_assets.contains(&asset_id)
    }

    fn max_unadjusted_gas(&self) -> u64 {
        self.tx_gas_overrides
            .values()
            .copied()
            .chain([self.tx_gas])
            .max()
            .unwrap_or(self.tx_gas)
    }

    fn max_tx_call_data(&self) -> u64 {
        self.tx_call_data
    }
}

/// [`RollupCreator`] that fabricates circuit inputs and proofs instantly.
#[derive(Clone, Default)]
pub struct MockRollupCreator {
    interrupted: Arc<AtomicBool>,
    fail_proofs: Arc<AtomicBool>,
    created_chunks: Arc<Mutex<Vec<Vec<TxId>>>>,
}

impl MockRollupCreator {
    /// Whether [`RollupCreator::interrupt`] has been called.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Make every subsequent proof attempt fail.
    pub fn fail_proofs(&self) {
        self.fail_proofs.store(true, Ordering::SeqCst);
    }

    /// Transaction ids of the inner-rollup chunks built so far, in build
    /// order.
    pub fn created_chunks(&self) -> Vec<Vec<TxId>> {
        self.created_chunks.lock().unwrap().clone()
    }
}

#[async_trait]
impl RollupCreator for MockRollupCreator {
    async fn create_rollup(
        &self,
        txs: &[PendingTx],
        _bridge_call_datas: &[U256],
        _asset_ids: &[u32],
        _is_first: bool,
    ) -> anyhow::Result<CircuitInput> {
        self.created_chunks
            .lock()
            .unwrap()
            .push(txs.iter().map(|tx| tx.id).collect());
        Ok(CircuitInput(vec![txs.len() as u8]))
    }

    async fn create_proof(
        &self,
        _txs: &[PendingTx],
        circuit_input: CircuitInput,
    ) -> anyhow::Result<InnerProof> {
        if self.fail_proofs.load(Ordering::SeqCst) {
            bail!("proof construction failed");
        }
        Ok(InnerProof(circuit_input.0))
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

/// [`RollupAggregator`] assigning sequential rollup ids.
#[derive(Clone, Default)]
pub struct MockRollupAggregator {
    next_rollup_id: Arc<AtomicU64>,
    interrupted: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl MockRollupAggregator {
    /// Whether [`RollupAggregator::interrupt`] has been called.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Make every subsequent aggregation attempt fail.
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RollupAggregator for MockRollupAggregator {
    async fn aggregate_rollup_proofs(
        &self,
        inner_proofs: Vec<InnerProof>,
        _old_defi_root: B256,
        padded_bridge_call_datas: &[U256],
        asset_ids: &[u32],
    ) -> anyhow::Result<RollupDao> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("aggregation failed");
        }
        Ok(RollupDao {
            rollup_id: self.next_rollup_id.fetch_add(1, Ordering::SeqCst),
            bridge_call_datas: padded_bridge_call_datas.to_vec(),
            asset_ids: asset_ids.to_vec(),
            proof_data: inner_proofs.into_iter().flat_map(|p| p.0).collect(),
        })
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

/// [`RollupPublisher`] recording everything it is asked to publish.
#[derive(Clone)]
pub struct MockRollupPublisher {
    accept: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
    published: Arc<Mutex<Vec<RollupDao>>>,
}

impl Default for MockRollupPublisher {
    fn default() -> Self {
        Self {
            accept: Arc::new(AtomicBool::new(true)),
            fail: Arc::new(AtomicBool::new(false)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockRollupPublisher {
    /// Make the settlement layer reject (but not error on) submissions.
    pub fn reject(&self) {
        self.accept.store(false, Ordering::SeqCst);
    }

    /// Make every subsequent submission fail.
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Rollups submitted so far, in submission order.
    pub fn published(&self) -> Vec<RollupDao> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RollupPublisher for MockRollupPublisher {
    async fn publish_rollup(&self, rollup: &RollupDao, _estimated_gas: u64) -> anyhow::Result<bool> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("settlement layer unreachable");
        }
        self.published.lock().unwrap().push(rollup.clone());
        Ok(self.accept.load(Ordering::SeqCst))
    }
}

/// In-memory [`RollupDb`].
#[derive(Clone, Default)]
pub struct MockRollupDb {
    txs: Arc<Mutex<Vec<PendingTx>>>,
    deleted: Arc<Mutex<Vec<TxId>>>,
}

impl MockRollupDb {
    /// A store pre-populated with `txs`, in submission order.
    pub fn new(txs: Vec<PendingTx>) -> Self {
        Self {
            txs: Arc::new(Mutex::new(txs)),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Ids deleted so far, in deletion order.
    pub fn deleted(&self) -> Vec<TxId> {
        self.deleted.lock().unwrap().clone()
    }

    /// The transactions still pending.
    pub fn remaining(&self) -> Vec<PendingTx> {
        self.txs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RollupDb for MockRollupDb {
    async fn pending_txs(&self) -> anyhow::Result<Vec<PendingTx>> {
        Ok(self.txs.lock().unwrap().clone())
    }

    async fn delete_txs(&self, ids: &[TxId]) -> anyhow::Result<()> {
        let mut txs = self.txs.lock().unwrap();
        txs.retain(|tx| !ids.contains(&tx.id));
        self.deleted.lock().unwrap().extend_from_slice(ids);
        Ok(())
    }
}

/// In-memory [`NullifierView`].
#[derive(Clone, Default)]
pub struct MockNullifierView {
    spent: Arc<Mutex<HashSet<B256>>>,
}

impl MockNullifierView {
    /// Mark a nullifier as spent.
    pub fn mark_spent(&self, nullifier: B256) {
        self.spent.lock().unwrap().insert(nullifier);
    }
}

#[async_trait]
impl NullifierView for MockNullifierView {
    async fn is_spent(&self, nullifier: B256) -> anyhow::Result<bool> {
        Ok(self.spent.lock().unwrap().contains(&nullifier))
    }
}

/// In-memory [`PendingDepositView`].
#[derive(Clone, Default)]
pub struct MockPendingDepositView {
    deposits: Arc<Mutex<HashMap<(u32, Address), U256>>>,
}

impl MockPendingDepositView {
    /// Set the escrowed balance for an (asset, owner) pair.
    pub fn set_pending_deposit(&self, asset_id: u32, owner: Address, value: U256) {
        self.deposits.lock().unwrap().insert((asset_id, owner), value);
    }
}

#[async_trait]
impl PendingDepositView for MockPendingDepositView {
    async fn pending_deposit(&self, asset_id: u32, owner: Address) -> anyhow::Result<U256> {
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .get(&(asset_id, owner))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}
