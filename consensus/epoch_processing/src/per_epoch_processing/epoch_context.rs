use super::Error;
use safe_arith::SafeArith;
use types::{ChainSpec, Epoch, ForkName};

/// Epoch-level facts shared by every component of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochContext {
    current_epoch: Epoch,
    previous_epoch: Epoch,
    finalized_epoch: Epoch,
    finality_delay: u64,
    is_in_inactivity_leak: bool,
    fork_name: ForkName,
}

impl EpochContext {
    /// Returns an error if `finalized_epoch` is later than the previous epoch.
    pub fn new(
        current_epoch: Epoch,
        finalized_epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Self, Error> {
        let previous_epoch = if current_epoch > spec.genesis_epoch {
            Epoch::new(current_epoch.as_u64().safe_sub(1)?)
        } else {
            spec.genesis_epoch
        };
        let finality_delay = previous_epoch
            .as_u64()
            .safe_sub(finalized_epoch.as_u64())?;

        Ok(Self {
            current_epoch,
            previous_epoch,
            finalized_epoch,
            finality_delay,
            is_in_inactivity_leak: finality_delay > spec.min_epochs_to_inactivity_penalty,
            fork_name: spec.fork_name_at_epoch(current_epoch),
        })
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    /// The epoch before `current_epoch`, or genesis if `current_epoch` is genesis.
    pub fn previous_epoch(&self) -> Epoch {
        self.previous_epoch
    }

    pub fn finalized_epoch(&self) -> Epoch {
        self.finalized_epoch
    }

    pub fn finality_delay(&self) -> u64 {
        self.finality_delay
    }

    pub fn is_in_inactivity_leak(&self) -> bool {
        self.is_in_inactivity_leak
    }

    pub fn fork_name(&self) -> ForkName {
        self.fork_name
    }

    pub fn is_genesis_epoch(&self, spec: &ChainSpec) -> bool {
        self.current_epoch == spec.genesis_epoch
    }
}
