//! Types consumed and produced by epoch accounting.

pub mod chain_spec;
pub mod fork_name;
pub mod participation;
pub mod preset;
pub mod registry;
pub mod slot_epoch;
pub mod validator;

pub use crate::chain_spec::ChainSpec;
pub use crate::fork_name::ForkName;
pub use crate::participation::{
    ParticipationFlags, ParticipationRecord, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX,
    TIMELY_TARGET_FLAG_INDEX,
};
pub use crate::preset::{AltairPreset, BasePreset};
pub use crate::registry::{
    EpochParticipation, Error as RegistryError, ParticipationProvider, ParticipationRecords,
    RegistrySnapshot, ValidatorRegistry, ValidatorRegistryMut,
};
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::validator::Validator;
