use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::VIRTUAL_ASSET_BIT;

const ADDRESS_ID_SHIFT: usize = 0;
const INPUT_ASSET_A_SHIFT: usize = 32;
const INPUT_ASSET_B_SHIFT: usize = 62;
const OUTPUT_ASSET_A_SHIFT: usize = 92;
const OUTPUT_ASSET_B_SHIFT: usize = 122;
const BIT_CONFIG_SHIFT: usize = 152;
const AUX_DATA_SHIFT: usize = 184;
const ENCODED_BIT_LEN: usize = 248;

const ASSET_ID_BITS: usize = 30;
const ADDRESS_ID_BITS: usize = 32;
const BIT_CONFIG_BITS: usize = 32;
const AUX_DATA_BITS: usize = 64;

const SECOND_INPUT_IN_USE: u32 = 1;
const SECOND_OUTPUT_IN_USE: u32 = 1 << 1;

/// Whether an asset id refers to a virtual asset (the output of a prior DeFi
/// interaction, addressed by interaction nonce) rather than an on-chain asset.
pub fn is_virtual_asset(asset_id: u32) -> bool {
    asset_id & (1 << VIRTUAL_ASSET_BIT) != 0
}

/// Error produced when decoding a 256-bit bridge call data word.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeCallDataError {
    /// Bits above the encoded width were set.
    #[error("bridge call data has non-zero bits above bit 248")]
    UnusedBitsSet,
    /// The bit config contains flags this codec does not know about.
    #[error("bridge call data has unsupported bit config flags: {0:#x}")]
    UnsupportedBitConfig(u32),
    /// The second input asset field is populated but flagged unused.
    #[error("second input asset id set but not flagged in use")]
    InactiveSecondInput,
    /// The second output asset field is populated but flagged unused.
    #[error("second output asset id set but not flagged in use")]
    InactiveSecondOutput,
}

/// Structured view of the 256-bit bridge call data identifying a single DeFi
/// bridge invocation.
///
/// Field layout, least significant bit first: bridge address id (32 bits),
/// input asset A (30), input asset B (30), output asset A (30), output asset
/// B (30), bit config (32), aux data (64). The top 8 bits are unused. Each
/// 30-bit asset field carries the virtual-asset flag at
/// [`VIRTUAL_ASSET_BIT`](crate::constants::VIRTUAL_ASSET_BIT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeCallData {
    /// Registry id of the bridge contract to invoke.
    pub bridge_address_id: u32,
    /// First input asset.
    pub input_asset_id_a: u32,
    /// Optional second input asset.
    pub input_asset_id_b: Option<u32>,
    /// First output asset.
    pub output_asset_id_a: u32,
    /// Optional second output asset.
    pub output_asset_id_b: Option<u32>,
    /// Bridge-specific auxiliary data (e.g. a pool fee tier or expiry).
    pub aux_data: u64,
}

fn mask(bits: usize) -> U256 {
    (U256::from(1u8) << bits) - U256::from(1u8)
}

fn field(data: U256, shift: usize, bits: usize) -> u64 {
    ((data >> shift) & mask(bits)).to::<u64>()
}

impl BridgeCallData {
    /// Encode into the canonical 256-bit word.
    pub fn encode(&self) -> U256 {
        let mut bit_config = 0u32;
        if self.input_asset_id_b.is_some() {
            bit_config |= SECOND_INPUT_IN_USE;
        }
        if self.output_asset_id_b.is_some() {
            bit_config |= SECOND_OUTPUT_IN_USE;
        }

        let mut data = U256::from(self.bridge_address_id) << ADDRESS_ID_SHIFT;
        data |= U256::from(self.input_asset_id_a) << INPUT_ASSET_A_SHIFT;
        data |= U256::from(self.input_asset_id_b.unwrap_or(0)) << INPUT_ASSET_B_SHIFT;
        data |= U256::from(self.output_asset_id_a) << OUTPUT_ASSET_A_SHIFT;
        data |= U256::from(self.output_asset_id_b.unwrap_or(0)) << OUTPUT_ASSET_B_SHIFT;
        data |= U256::from(bit_config) << BIT_CONFIG_SHIFT;
        data |= U256::from(self.aux_data) << AUX_DATA_SHIFT;
        data
    }

    /// Decode a 256-bit word, validating that unused fields are zeroed.
    pub fn decode(data: U256) -> Result<Self, BridgeCallDataError> {
        if data >> ENCODED_BIT_LEN != U256::ZERO {
            return Err(BridgeCallDataError::UnusedBitsSet);
        }

        let bit_config = field(data, BIT_CONFIG_SHIFT, BIT_CONFIG_BITS) as u32;
        let unknown = bit_config & !(SECOND_INPUT_IN_USE | SECOND_OUTPUT_IN_USE);
        if unknown != 0 {
            return Err(BridgeCallDataError::UnsupportedBitConfig(unknown));
        }

        let input_asset_id_b = field(data, INPUT_ASSET_B_SHIFT, ASSET_ID_BITS) as u32;
        let output_asset_id_b = field(data, OUTPUT_ASSET_B_SHIFT, ASSET_ID_BITS) as u32;
        if bit_config & SECOND_INPUT_IN_USE == 0 && input_asset_id_b != 0 {
            return Err(BridgeCallDataError::InactiveSecondInput);
        }
        if bit_config & SECOND_OUTPUT_IN_USE == 0 && output_asset_id_b != 0 {
            return Err(BridgeCallDataError::InactiveSecondOutput);
        }

        Ok(Self {
            bridge_address_id: field(data, ADDRESS_ID_SHIFT, ADDRESS_ID_BITS) as u32,
            input_asset_id_a: field(data, INPUT_ASSET_A_SHIFT, ASSET_ID_BITS) as u32,
            input_asset_id_b: (bit_config & SECOND_INPUT_IN_USE != 0).then_some(input_asset_id_b),
            output_asset_id_a: field(data, OUTPUT_ASSET_A_SHIFT, ASSET_ID_BITS) as u32,
            output_asset_id_b: (bit_config & SECOND_OUTPUT_IN_USE != 0)
                .then_some(output_asset_id_b),
            aux_data: field(data, AUX_DATA_SHIFT, AUX_DATA_BITS),
        })
    }
}

/// Per-bridge policy registered with the bridge configuration registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// The bridge interaction this config applies to.
    pub bridge_call_data: U256,
    /// Number of transactions the bridge's fixed cost is quoted across.
    pub num_txs: u32,
    /// Fixed settlement-layer gas cost of one bridge interaction.
    pub gas: u64,
    /// Publish frequency in multiples of the base publish interval. Values
    /// below 1 exclude the bridge from deadline tracking; it then enters
    /// rollups on profitability alone.
    pub rollup_frequency: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BridgeCallData {
        BridgeCallData {
            bridge_address_id: 7,
            input_asset_id_a: 2,
            input_asset_id_b: None,
            output_asset_id_a: 1 << VIRTUAL_ASSET_BIT,
            output_asset_id_b: Some(3),
            aux_data: 0xdead_beef,
        }
    }

    #[test]
    fn encode_decode_preserves_fields() {
        let bcd = sample();
        assert_eq!(bcd, BridgeCallData::decode(bcd.encode()).unwrap());
    }

    #[test]
    fn virtual_flag_is_bit_29() {
        let bcd = sample();
        assert!(is_virtual_asset(bcd.output_asset_id_a));
        assert!(!is_virtual_asset(bcd.input_asset_id_a));
    }

    #[test]
    fn rejects_dirty_high_bits() {
        let data = sample().encode() | (U256::from(1u8) << 255);
        assert_eq!(
            BridgeCallData::decode(data),
            Err(BridgeCallDataError::UnusedBitsSet)
        );
    }

    #[test]
    fn rejects_inactive_second_input() {
        // Populate input asset B without raising its in-use flag.
        let data = sample().encode() | (U256::from(5u8) << INPUT_ASSET_B_SHIFT);
        assert_eq!(
            BridgeCallData::decode(data),
            Err(BridgeCallDataError::InactiveSecondInput)
        );
    }

    #[test]
    fn rejects_unknown_bit_config_flags() {
        let data = sample().encode() | (U256::from(4u8) << BIT_CONFIG_SHIFT);
        assert!(matches!(
            BridgeCallData::decode(data),
            Err(BridgeCallDataError::UnsupportedBitConfig(4))
        ));
    }
}
