use alloy_primitives::{B256, U256};
use chrono::{DateTime, Utc};
use zkr_rollup_interface::{BridgeCallData, BridgeCallDataError, PendingTx, TxType};

/// A pending transaction as seen by the selection pass, with its bridge call
/// data decoded. Created on entry to selection, never mutated, dropped when
/// the tick completes or is interrupted.
#[derive(Debug, Clone)]
pub struct RollupTx {
    tx: PendingTx,
    bridge_call_data: Option<BridgeCallData>,
}

impl RollupTx {
    /// Decode the proof-data view of a pending transaction.
    pub fn new(tx: PendingTx) -> Result<Self, BridgeCallDataError> {
        let bridge_call_data = tx.bridge_call_data.map(BridgeCallData::decode).transpose()?;
        Ok(Self {
            tx,
            bridge_call_data,
        })
    }

    /// The underlying database record.
    pub fn inner(&self) -> &PendingTx {
        &self.tx
    }

    /// Proof-system transaction kind.
    pub fn tx_type(&self) -> TxType {
        self.tx.tx_type
    }

    /// Asset the fee is denominated in.
    pub fn fee_asset_id(&self) -> u32 {
        self.tx.fee_asset_id
    }

    /// Gas paid above the minimum quote.
    pub fn excess_gas(&self) -> i64 {
        self.tx.excess_gas
    }

    /// Submission time.
    pub fn created(&self) -> DateTime<Utc> {
        self.tx.created
    }

    /// The predecessor note commitment this transaction chains off, if any.
    pub fn backward_link(&self) -> Option<B256> {
        self.tx.backward_link()
    }

    /// Both output note commitments.
    pub fn note_commitments(&self) -> [B256; 2] {
        [self.tx.note_commitment1, self.tx.note_commitment2]
    }

    /// The encoded bridge call data, for DeFi deposits.
    pub fn encoded_bridge_call_data(&self) -> Option<U256> {
        self.tx.bridge_call_data
    }

    /// The decoded bridge call data, for DeFi deposits.
    pub fn bridge_call_data(&self) -> Option<&BridgeCallData> {
        self.bridge_call_data.as_ref()
    }
}
