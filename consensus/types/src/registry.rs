use crate::{ParticipationRecord, Validator};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    UnknownValidator(usize),
    /// The registry lists were constructed with different lengths.
    InconsistentLengths {
        validators: usize,
        balances: usize,
        inactivity_scores: usize,
    },
}

/// Read access to the validator registry at the start of an epoch transition.
///
/// All lookups are by dense validator index. An index with no entry returns `None`.
pub trait ValidatorRegistry {
    fn num_validators(&self) -> usize;

    fn get_validator(&self, index: usize) -> Option<&Validator>;

    fn get_balance(&self, index: usize) -> Option<u64>;

    fn get_inactivity_score(&self, index: usize) -> Option<u64>;
}

/// Mutable access used when an epoch transition is committed.
pub trait ValidatorRegistryMut: ValidatorRegistry {
    fn get_validator_mut(&mut self, index: usize) -> Option<&mut Validator>;

    fn get_balance_mut(&mut self, index: usize) -> Option<&mut u64>;

    fn get_inactivity_score_mut(&mut self, index: usize) -> Option<&mut u64>;
}

/// Attestation participation for one epoch, keyed by validator index.
///
/// `None` means the provider holds no data for `index` at all, which is distinct from
/// `Some(&[])`: the validator was known and did not attest.
pub trait ParticipationProvider {
    fn participation(&self, index: usize) -> Option<&[ParticipationRecord]>;
}

/// An owned, in-memory validator registry.
///
/// The three lists are index-aligned.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    validators: Vec<Validator>,
    #[serde(with = "serde_utils::quoted_u64_vec")]
    balances: Vec<u64>,
    #[serde(with = "serde_utils::quoted_u64_vec")]
    inactivity_scores: Vec<u64>,
}

impl RegistrySnapshot {
    pub fn new(
        validators: Vec<Validator>,
        balances: Vec<u64>,
        inactivity_scores: Vec<u64>,
    ) -> Result<Self, Error> {
        if validators.len() != balances.len() || validators.len() != inactivity_scores.len() {
            return Err(Error::InconsistentLengths {
                validators: validators.len(),
                balances: balances.len(),
                inactivity_scores: inactivity_scores.len(),
            });
        }
        Ok(Self {
            validators,
            balances,
            inactivity_scores,
        })
    }

    /// Append a validator with an inactivity score of zero, returning its index.
    pub fn push(&mut self, validator: Validator, balance: u64) -> usize {
        self.validators.push(validator);
        self.balances.push(balance);
        self.inactivity_scores.push(0);
        self.validators.len().saturating_sub(1)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn balances(&self) -> &[u64] {
        &self.balances
    }

    pub fn inactivity_scores(&self) -> &[u64] {
        &self.inactivity_scores
    }
}

impl ValidatorRegistry for RegistrySnapshot {
    fn num_validators(&self) -> usize {
        self.validators.len()
    }

    fn get_validator(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    fn get_balance(&self, index: usize) -> Option<u64> {
        self.balances.get(index).copied()
    }

    fn get_inactivity_score(&self, index: usize) -> Option<u64> {
        self.inactivity_scores.get(index).copied()
    }
}

impl ValidatorRegistryMut for RegistrySnapshot {
    fn get_validator_mut(&mut self, index: usize) -> Option<&mut Validator> {
        self.validators.get_mut(index)
    }

    fn get_balance_mut(&mut self, index: usize) -> Option<&mut u64> {
        self.balances.get_mut(index)
    }

    fn get_inactivity_score_mut(&mut self, index: usize) -> Option<&mut u64> {
        self.inactivity_scores.get_mut(index)
    }
}

/// Most validators have zero or one included attestation per epoch.
pub type ParticipationRecords = SmallVec<[ParticipationRecord; 1]>;

/// In-memory participation for a single epoch.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct EpochParticipation {
    records: Vec<ParticipationRecords>,
}

impl EpochParticipation {
    /// Participation for `validator_count` validators, none of whom attested.
    pub fn new(validator_count: usize) -> Self {
        Self {
            records: vec![ParticipationRecords::new(); validator_count],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_record(
        &mut self,
        validator_index: usize,
        record: ParticipationRecord,
    ) -> Result<(), Error> {
        self.records
            .get_mut(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))?
            .push(record);
        Ok(())
    }

    /// Record one aggregate attestation against each of its attesting validators.
    ///
    /// Nothing is recorded if any index is unknown.
    pub fn add_attestation(
        &mut self,
        attesting_indices: &[usize],
        record: ParticipationRecord,
    ) -> Result<(), Error> {
        if let Some(&unknown) = attesting_indices
            .iter()
            .find(|&&i| i >= self.records.len())
        {
            return Err(Error::UnknownValidator(unknown));
        }
        for &validator_index in attesting_indices {
            self.add_record(validator_index, record)?;
        }
        Ok(())
    }
}

impl ParticipationProvider for EpochParticipation {
    fn participation(&self, index: usize) -> Option<&[ParticipationRecord]> {
        self.records.get(index).map(|records| records.as_slice())
    }
}
