use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a pending transaction, assigned on submission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(
    /// Raw 32-byte identifier.
    pub [u8; 32],
);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&B256::new(self.0), f)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

impl FromStr for TxId {
    type Err = <B256 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<B256>().map(|id| TxId(id.0))
    }
}

/// The proof-system transaction kinds understood by the rollup circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    /// Move funds from the settlement layer into the rollup.
    Deposit,
    /// Transfer funds between rollup accounts.
    Transfer,
    /// Withdraw to a settlement-layer address with a cheap receiver.
    WithdrawLowGas,
    /// Withdraw to a settlement-layer address with an expensive receiver
    /// (e.g. a contract wallet).
    WithdrawHighGas,
    /// Register or update account keys. Pays no fee.
    Account,
    /// Enqueue funds for a DeFi bridge interaction.
    DefiDeposit,
    /// Claim the output notes of a settled DeFi interaction.
    DefiClaim,
}

impl TxType {
    /// Number of transaction kinds.
    pub const COUNT: usize = 7;

    /// Dense index of this kind, used for per-type counters.
    pub fn index(self) -> usize {
        match self {
            TxType::Deposit => 0,
            TxType::Transfer => 1,
            TxType::WithdrawLowGas => 2,
            TxType::WithdrawHighGas => 3,
            TxType::Account => 4,
            TxType::DefiDeposit => 5,
            TxType::DefiClaim => 6,
        }
    }

    /// All kinds, in index order.
    pub fn all() -> [TxType; TxType::COUNT] {
        [
            TxType::Deposit,
            TxType::Transfer,
            TxType::WithdrawLowGas,
            TxType::WithdrawHighGas,
            TxType::Account,
            TxType::DefiDeposit,
            TxType::DefiClaim,
        ]
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxType::Deposit => "DEPOSIT",
            TxType::Transfer => "TRANSFER",
            TxType::WithdrawLowGas => "WITHDRAW_LOW_GAS",
            TxType::WithdrawHighGas => "WITHDRAW_HIGH_GAS",
            TxType::Account => "ACCOUNT",
            TxType::DefiDeposit => "DEFI_DEPOSIT",
            TxType::DefiClaim => "DEFI_CLAIM",
        };
        f.write_str(name)
    }
}

/// A pending transaction as read from the rollup database, with the fields of
/// its client proof data already decoded.
///
/// Instances are snapshots: the coordinator reads the pending set once per
/// tick and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    /// Database identifier.
    pub id: TxId,
    /// Proof-system transaction kind.
    pub tx_type: TxType,
    /// First output note commitment.
    pub note_commitment1: B256,
    /// Second output note commitment.
    pub note_commitment2: B256,
    /// First input note nullifier. Zero when the proof spends no such note.
    pub nullifier1: B256,
    /// Second input note nullifier. Zero when the proof spends no such note.
    pub nullifier2: B256,
    /// Commitment of a prior transaction's output note consumed by this one.
    /// All zeroes means "no predecessor".
    pub backward_link: B256,
    /// Public value moved across the settlement boundary. Only meaningful for
    /// deposits and withdrawals.
    pub public_value: U256,
    /// Settlement-layer account the public value belongs to.
    pub public_owner: Address,
    /// Asset the fee is denominated in.
    pub fee_asset_id: u32,
    /// Fee paid, in wei-scale units of the fee asset.
    pub fee_value: U256,
    /// Encoded bridge call data. Present only for [`TxType::DefiDeposit`].
    pub bridge_call_data: Option<U256>,
    /// Wall-clock submission time.
    pub created: DateTime<Utc>,
    /// Gas paid above the minimum quoted for this transaction kind at
    /// submission time.
    pub excess_gas: i64,
}

impl PendingTx {
    /// The predecessor note commitment this transaction chains off, if any.
    pub fn backward_link(&self) -> Option<B256> {
        if self.backward_link.is_zero() {
            None
        } else {
            Some(self.backward_link)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_hex_round_trip() {
        let id = TxId([0xab; 32]);
        let s = id.to_string();
        assert!(s.starts_with("0xabab"));
        assert_eq!(id, s.parse().unwrap());
    }

    #[test]
    fn tx_id_rejects_short_input() {
        assert!("0xabab".parse::<TxId>().is_err());
    }

    #[test]
    fn tx_type_indices_are_dense() {
        for (i, ty) in TxType::all().into_iter().enumerate() {
            assert_eq!(i, ty.index());
        }
    }
}
