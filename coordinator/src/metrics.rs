//! Prometheus metrics for the coordinator. Recording never affects the
//! publication outcome; failures here are logged and swallowed.

use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};

use crate::profile::RollupProfile;

/// Rollups accepted by the settlement layer.
pub static ROLLUPS_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coordinator_rollups_published",
        "Rollups accepted by the settlement layer"
    )
    .unwrap()
});

/// Transactions included in published rollups, by kind.
pub static TXS_PUBLISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coordinator_txs_published",
        "Transactions included in published rollups",
        &["tx_type"]
    )
    .unwrap()
});

/// Gas balance of the most recent selection outcome.
pub static GAS_BALANCE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "coordinator_gas_balance",
        "Gas balance of the most recent selection outcome"
    )
    .unwrap()
});

/// Wall-clock seconds from selection completion to publication outcome.
pub static PUBLISH_LATENCY_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "coordinator_publish_latency_seconds",
        "Seconds from selection completion to publication outcome",
        exponential_buckets(/*start=*/ 0.1, /*factor=*/ 2.0, /*count=*/ 12).unwrap()
    )
    .unwrap()
});

/// Pending transactions deleted by the block-level validator.
pub static TXS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coordinator_txs_rejected",
        "Pending transactions deleted by the block-level validator"
    )
    .unwrap()
});

/// Record a selection outcome, and inclusion counts if it published.
pub fn record_profile(profile: &RollupProfile) {
    GAS_BALANCE.set(profile.gas_balance);
    if !profile.published {
        return;
    }
    ROLLUPS_PUBLISHED.inc();
    for (tx_type, count) in zkr_rollup_interface::TxType::all()
        .into_iter()
        .zip(profile.num_txs_per_type)
    {
        let label = tx_type.to_string();
        TXS_PUBLISHED
            .with_label_values(&[label.as_str()])
            .inc_by(count as u64);
    }
}
