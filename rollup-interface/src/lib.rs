//! This crate defines the core types and collaborator traits used by the
//! zk-rollup sequencer node. It specifies the interfaces between the batch
//! coordinator and its collaborators (fee oracle, bridge registry, proving
//! backend, settlement publisher, transaction database) so that each can be
//! swapped independently of the coordination logic.
#![deny(missing_docs)]

mod bridge;
mod constants;
mod fees;
mod services;
mod time;
mod tx;

#[cfg(feature = "mocks")]
pub mod mocks;

pub use bridge::{is_virtual_asset, BridgeCallData, BridgeCallDataError, BridgeConfig};
pub use constants::{NUMBER_OF_ASSETS, NUM_BRIDGE_CALLS_PER_BLOCK, VIRTUAL_ASSET_BIT};
pub use fees::TxFeeResolver;
pub use services::{
    BridgeResolver, CircuitInput, InnerProof, NullifierView, PendingDepositView, RollupAggregator,
    RollupCreator, RollupDao, RollupDb, RollupPublisher,
};
pub use time::{Clock, RollupTimeouts, SystemClock, Timeout};
pub use tx::{PendingTx, TxId, TxType};
