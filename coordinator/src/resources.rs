use alloy_primitives::U256;

/// Resource accumulator for one rollup under construction.
///
/// `bridge_call_datas` and `asset_ids` are admission-ordered and duplicate
/// free; their caps ([`NUM_BRIDGE_CALLS_PER_BLOCK`] and [`NUMBER_OF_ASSETS`])
/// are enforced by the selection logic, not here.
///
/// [`NUM_BRIDGE_CALLS_PER_BLOCK`]: zkr_rollup_interface::NUM_BRIDGE_CALLS_PER_BLOCK
/// [`NUMBER_OF_ASSETS`]: zkr_rollup_interface::NUMBER_OF_ASSETS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupResources {
    /// Settlement-layer gas reserved so far.
    pub gas_used: u64,
    /// Settlement-layer calldata reserved so far, in bytes.
    pub call_data_used: u64,
    /// Bridges admitted so far, in admission order.
    pub bridge_call_datas: Vec<U256>,
    /// Fee-paying assets admitted so far, in admission order.
    pub asset_ids: Vec<u32>,
}

impl RollupResources {
    /// An accumulator with `gas_used` already reserved.
    pub fn new(gas_used: u64) -> Self {
        Self {
            gas_used,
            ..Default::default()
        }
    }

    /// Whether a bridge already occupies one of the rollup's bridge slots.
    pub fn has_bridge(&self, bridge_call_data: U256) -> bool {
        self.bridge_call_datas.contains(&bridge_call_data)
    }

    /// Whether an asset already occupies one of the rollup's asset slots.
    pub fn has_asset(&self, asset_id: u32) -> bool {
        self.asset_ids.contains(&asset_id)
    }

    /// Record a bridge slot.
    pub fn add_bridge(&mut self, bridge_call_data: U256) {
        if !self.has_bridge(bridge_call_data) {
            self.bridge_call_datas.push(bridge_call_data);
        }
    }

    /// Record an asset slot.
    pub fn add_asset(&mut self, asset_id: u32) {
        if !self.has_asset(asset_id) {
            self.asset_ids.push(asset_id);
        }
    }

    /// Fold the resources consumed by a bridge-queue admission into this
    /// accumulator.
    pub fn merge(&mut self, consumed: RollupResources) {
        self.gas_used += consumed.gas_used;
        self.call_data_used += consumed.call_data_used;
        for bridge_call_data in consumed.bridge_call_datas {
            self.add_bridge(bridge_call_data);
        }
        for asset_id in consumed.asset_ids {
            self.add_asset(asset_id);
        }
    }
}
