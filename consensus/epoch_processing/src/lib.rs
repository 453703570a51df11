// Clippy lint set-up (disabled in tests)
#![cfg_attr(
    not(test),
    deny(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::let_underscore_must_use
    )
)]

mod metrics;

pub mod common;
pub mod per_epoch_processing;

pub use per_epoch_processing::{
    errors::{EpochProcessingError, InvariantViolation},
    process_epoch, EpochContext, EpochProcessingSummary, EpochTransition,
};
