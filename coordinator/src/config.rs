use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Rollup-shape and publication parameters for the coordinator. Values are
/// injected at construction; there is no CLI surface in this crate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoordinatorConfig {
    /// Transactions per inner rollup circuit.
    pub num_inner_rollup_txs: usize,
    /// Inner proofs aggregated into one published rollup.
    pub num_outer_rollup_proofs: usize,
    /// Settlement-layer gas ceiling for one published rollup.
    pub max_rollup_gas: u64,
    /// Settlement-layer calldata ceiling for one published rollup, in bytes.
    pub max_rollup_call_data: u64,
    /// Base publish interval in seconds. Intervals below one second disable
    /// deadline tracking entirely.
    pub publish_interval_secs: f64,
}

impl CoordinatorConfig {
    /// Total transaction slots in one published rollup.
    pub fn total_slots(&self) -> usize {
        self.num_inner_rollup_txs * self.num_outer_rollup_proofs
    }
}

/// Deserializes a toml file into a config value.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = raw.len(), "read config file");

    toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
}
