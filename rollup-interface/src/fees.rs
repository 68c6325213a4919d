use alloy_primitives::U256;

use crate::tx::TxType;

/// The fee-quoting oracle. Gas figures are "unadjusted": raw circuit and
/// settlement-layer costs before any fee-subsidy policy is applied.
///
/// Implementations are expected to answer from cached fee data; these calls
/// sit on the coordinator's hot selection path.
pub trait TxFeeResolver: Send + Sync {
    /// Verification gas reserved for every rollup slot, filled or not.
    fn base_verification_gas(&self) -> u64;

    /// Full unadjusted gas cost of one transaction of the given kind paying
    /// fees in the given asset. Always at least
    /// [`base_verification_gas`](Self::base_verification_gas).
    fn tx_gas(&self, fee_asset_id: u32, tx_type: TxType) -> u64;

    /// Settlement-layer calldata bytes consumed by one transaction of the
    /// given kind.
    fn tx_call_data(&self, tx_type: TxType) -> u64;

    /// The per-transaction share of a bridge's fixed cost, as quoted to
    /// clients: the bridge gas divided across its configured batch size.
    fn single_bridge_tx_gas(&self, bridge_call_data: U256) -> u64;

    /// The full fixed gas cost of one interaction of this bridge, as
    /// published by the settlement-layer contract.
    fn full_bridge_gas(&self, bridge_call_data: U256) -> u64;

    /// Whether fees may be paid in this asset. Non-fee-paying assets do not
    /// occupy a slot in a rollup's asset set.
    fn is_fee_paying_asset(&self, asset_id: u32) -> bool;

    /// The largest unadjusted gas any single transaction can cost. Used to
    /// decide when a rollup has no gas headroom left.
    fn max_unadjusted_gas(&self) -> u64;

    /// The largest calldata any single transaction can consume. Used to
    /// decide when a rollup has no calldata headroom left.
    fn max_tx_call_data(&self) -> u64;
}
