pub use metrics::*;
use std::sync::LazyLock;

/*
 * Epoch processing timing
 */
pub static PROCESS_EPOCH_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_process_epoch",
        "Time required for process_epoch",
    )
});
pub static PROCESS_EPOCH_BUILD_STATUSES_TIME: LazyLock<Result<Histogram>> = LazyLock::new(|| {
    try_create_histogram(
        "beacon_state_processing_process_epoch_build_validator_statuses",
        "Time required to build validator statuses and total balances",
    )
});
pub static PROCESS_EPOCH_REWARDS_AND_PENALTIES_TIME: LazyLock<Result<Histogram>> =
    LazyLock::new(|| {
        try_create_histogram(
            "beacon_state_processing_process_epoch_rewards_and_penalties",
            "Time required to compute rewards and penalties",
        )
    });
pub static PROCESS_EPOCH_EFFECTIVE_BALANCE_UPDATES_TIME: LazyLock<Result<Histogram>> =
    LazyLock::new(|| {
        try_create_histogram(
            "beacon_state_processing_process_epoch_effective_balance_updates",
            "Time required to compute effective balance updates",
        )
    });
pub static PROCESS_EPOCH_INACTIVITY_UPDATES_TIME: LazyLock<Result<Histogram>> =
    LazyLock::new(|| {
        try_create_histogram(
            "beacon_state_processing_process_epoch_inactivity_updates",
            "Time required to compute inactivity score updates",
        )
    });
pub static PROCESS_EPOCH_ERRORS_TOTAL: LazyLock<Result<IntCounter>> = LazyLock::new(|| {
    try_create_int_counter(
        "beacon_state_processing_process_epoch_errors_total",
        "Count of epoch transitions which failed",
    )
});

/*
 * Participation Metrics
 */
pub static PARTICIPATION_CURR_EPOCH_ACTIVE_GWEI_TOTAL: LazyLock<Result<IntGauge>> =
    LazyLock::new(|| {
        try_create_int_gauge(
            "beacon_participation_curr_epoch_active_gwei_total",
            "Total effective balance (gwei) of validators active in the current epoch",
        )
    });
pub static PARTICIPATION_PREV_EPOCH_ACTIVE_GWEI_TOTAL: LazyLock<Result<IntGauge>> =
    LazyLock::new(|| {
        try_create_int_gauge(
            "beacon_participation_prev_epoch_active_gwei_total",
            "Total effective balance (gwei) of validators active in the previous epoch",
        )
    });
pub static PARTICIPATION_PREV_EPOCH_TARGET_ATTESTING_GWEI_TOTAL: LazyLock<Result<IntGauge>> =
    LazyLock::new(|| {
        try_create_int_gauge(
            "beacon_participation_prev_epoch_target_attesting_gwei_total",
            "Total effective balance (gwei) of validators who attested to the target in the \
             previous epoch",
        )
    });
pub static PARTICIPATION_PREV_EPOCH_HEAD_ATTESTING_GWEI_TOTAL: LazyLock<Result<IntGauge>> =
    LazyLock::new(|| {
        try_create_int_gauge(
            "beacon_participation_prev_epoch_head_attesting_gwei_total",
            "Total effective balance (gwei) of validators who attested to the head in the \
             previous epoch",
        )
    });
