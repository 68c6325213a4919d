//! Batch admission and publication pipeline for the zk-rollup sequencer.
//!
//! Clients submit signed transactions into a pending pool; this crate decides
//! which of them enter the next fixed-shape rollup and when that rollup is
//! forced out regardless of profitability. The heavy lifting (proving,
//! publication, persistence, fee quoting) is delegated to the collaborator
//! traits defined in `zkr-rollup-interface`.
#![deny(missing_docs)]

mod block_validator;
mod bridge_queue;
mod config;
mod coordinator;
mod error;
pub mod metrics;
mod profile;
mod publish_time;
mod resources;
mod rollup_tx;

pub use block_validator::BlockTxValidator;
pub use bridge_queue::{BridgeQueueResult, BridgeTxQueue};
pub use config::{from_toml_path, CoordinatorConfig};
pub use coordinator::{CoordinatorState, RollupCoordinator};
pub use error::CoordinatorError;
pub use profile::{BridgeProfile, RollupProfile};
pub use publish_time::PublishTimeManager;
pub use resources::RollupResources;
pub use rollup_tx::RollupTx;
