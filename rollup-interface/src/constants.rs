//! Wire-format constants fixed per deployment. The on-chain contract and the
//! rollup circuits are compiled against these values, so they are plain
//! constants rather than configuration.

/// Number of bridge interaction slots in a published rollup block. The
/// bridge-call-data vector of every rollup is exactly this long, right-padded
/// with zeroes.
pub const NUM_BRIDGE_CALLS_PER_BLOCK: usize = 32;

/// Number of distinct fee-paying assets a single rollup block can settle.
pub const NUMBER_OF_ASSETS: usize = 16;

/// Bit position of the virtual-asset flag within each 30-bit asset-id field
/// of a bridge call data. Virtual assets reference a prior DeFi interaction
/// nonce instead of an on-chain asset.
pub const VIRTUAL_ASSET_BIT: u32 = 29;
