use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256, U256};
use tracing::{debug, info};
use zkr_rollup_interface::{NullifierView, PendingDepositView, RollupDb, TxId, TxType};

use crate::metrics;

/// Re-validates the pending pool against the chain after every settled
/// block, deleting transactions that can no longer settle: double spends,
/// deposits exceeding their on-chain escrow, and anything chaining off a
/// rejected transaction.
pub struct BlockTxValidator<Db, Nf, Dp> {
    rollup_db: Db,
    nullifiers: Nf,
    pending_deposits: Dp,
}

impl<Db, Nf, Dp> BlockTxValidator<Db, Nf, Dp>
where
    Db: RollupDb,
    Nf: NullifierView,
    Dp: PendingDepositView,
{
    /// Creates a validator over the given stores.
    pub fn new(rollup_db: Db, nullifiers: Nf, pending_deposits: Dp) -> Self {
        Self {
            rollup_db,
            nullifiers,
            pending_deposits,
        }
    }

    /// Run one validation pass and delete the rejected transactions in a
    /// single batch. Returns the deleted ids in pool order.
    ///
    /// Rejections are ordinary policy outcomes, not errors; only collaborator
    /// failures propagate.
    pub async fn validate_txs_on_block(&self) -> anyhow::Result<Vec<TxId>> {
        let pending = self.rollup_db.pending_txs().await?;

        let mut rejected_ids: Vec<TxId> = Vec::new();
        let mut rejected_commitments: HashSet<B256> = HashSet::new();
        // Escrow already claimed by accepted deposits in this pass.
        let mut consumed: HashMap<(u32, Address), U256> = HashMap::new();

        for tx in &pending {
            let mut reason: Option<&'static str> = None;

            for nullifier in [tx.nullifier1, tx.nullifier2] {
                if !nullifier.is_zero() && self.nullifiers.is_spent(nullifier).await? {
                    reason = Some("nullifier already spent");
                    break;
                }
            }

            if reason.is_none() {
                if let Some(link) = tx.backward_link() {
                    if rejected_commitments.contains(&link) {
                        reason = Some("chains off a rejected tx");
                    }
                }
            }

            if reason.is_none() && tx.tx_type == TxType::Deposit {
                let key = (tx.fee_asset_id, tx.public_owner);
                let escrow = self
                    .pending_deposits
                    .pending_deposit(tx.fee_asset_id, tx.public_owner)
                    .await?;
                let used = consumed.get(&key).copied().unwrap_or(U256::ZERO);
                if used + tx.public_value > escrow {
                    // Later, smaller deposits for this key may still fit.
                    reason = Some("deposit exceeds pending funds");
                } else {
                    consumed.insert(key, used + tx.public_value);
                }
            }

            if let Some(reason) = reason {
                debug!(tx_id = %tx.id, reason, "rejecting pending tx");
                rejected_commitments.insert(tx.note_commitment1);
                rejected_commitments.insert(tx.note_commitment2);
                rejected_ids.push(tx.id);
            }
        }

        if !rejected_ids.is_empty() {
            info!(num_txs = rejected_ids.len(), "deleting rejected pending txs");
            self.rollup_db.delete_txs(&rejected_ids).await?;
            metrics::TXS_REJECTED.inc_by(rejected_ids.len() as u64);
        }

        Ok(rejected_ids)
    }
}
