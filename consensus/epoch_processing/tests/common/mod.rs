#![allow(dead_code)]

use epoch_processing::{process_epoch, EpochContext, EpochProcessingError, EpochTransition};
use types::{
    ChainSpec, Epoch, EpochParticipation, ParticipationFlags, ParticipationRecord,
    RegistrySnapshot, Slot, Validator,
};

pub const GWEI: u64 = 1_000_000_000;

/// Builds a registry plus current and previous epoch participation for a single transition.
pub struct TestEpoch {
    pub spec: ChainSpec,
    pub registry: RegistrySnapshot,
    pub current: EpochParticipation,
    pub previous: EpochParticipation,
    pub current_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

impl TestEpoch {
    /// Validators active since genesis with `balance == effective_balance`, nobody attesting.
    pub fn new(spec: ChainSpec, effective_balances: &[u64], current_epoch: u64) -> Self {
        let mut registry = RegistrySnapshot::default();
        for &effective_balance in effective_balances {
            registry.push(
                Validator::active_from(spec.genesis_epoch, effective_balance, &spec),
                effective_balance,
            );
        }
        let current_epoch = Epoch::new(current_epoch);
        Self {
            spec,
            current: EpochParticipation::new(effective_balances.len()),
            previous: EpochParticipation::new(effective_balances.len()),
            registry,
            finalized_epoch: Epoch::new(current_epoch.as_u64().saturating_sub(2)),
            current_epoch,
        }
    }

    pub fn previous_epoch(&self) -> Epoch {
        self.context().unwrap().previous_epoch()
    }

    /// A previous-epoch record attesting at the first slot of the previous epoch.
    pub fn previous_record(
        &self,
        flags: ParticipationFlags,
        delay: u64,
        proposer_index: u64,
    ) -> ParticipationRecord {
        let attestation_slot = self.previous_epoch().start_slot(self.spec.slots_per_epoch);
        ParticipationRecord {
            flags,
            attestation_slot,
            inclusion_slot: Slot::new(attestation_slot.as_u64() + delay),
            proposer_index,
        }
    }

    pub fn attest_previous(
        &mut self,
        validator_index: usize,
        flags: ParticipationFlags,
        delay: u64,
        proposer_index: u64,
    ) {
        let record = self.previous_record(flags, delay, proposer_index);
        self.previous.add_record(validator_index, record).unwrap();
    }

    pub fn attest_current(&mut self, validator_index: usize, flags: ParticipationFlags) {
        let attestation_slot = self.current_epoch.start_slot(self.spec.slots_per_epoch);
        let record = ParticipationRecord {
            flags,
            attestation_slot,
            inclusion_slot: Slot::new(attestation_slot.as_u64() + 1),
            proposer_index: 0,
        };
        self.current.add_record(validator_index, record).unwrap();
    }

    pub fn context(&self) -> Result<EpochContext, EpochProcessingError> {
        EpochContext::new(self.current_epoch, self.finalized_epoch, &self.spec)
    }

    pub fn process(&self) -> Result<EpochTransition, EpochProcessingError> {
        process_epoch(
            &self.registry,
            &self.current,
            &self.previous,
            &self.context()?,
            &self.spec,
            &logging::test_logger(),
        )
    }
}

pub fn full() -> ParticipationFlags {
    ParticipationFlags::new(true, true, true)
}

pub fn source_only() -> ParticipationFlags {
    ParticipationFlags::new(true, false, false)
}
