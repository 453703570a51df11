use crate::ChainSpec;
use serde::{Deserialize, Serialize};

/// Value-level representation of the phase0 preset values read by epoch accounting.
///
/// Preset files use UPPERCASE keys and quoted integers, as published alongside the consensus
/// specs (e.g. `presets/mainnet/phase0.yaml`). Prefer the fields on `ChainSpec` to reading one of
/// these directly; a preset is only a way of loading or checking a `ChainSpec`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct BasePreset {
    #[serde(with = "serde_utils::quoted_u64")]
    pub max_effective_balance: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance_increment: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub hysteresis_quotient: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub hysteresis_downward_multiplier: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub hysteresis_upward_multiplier: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub min_attestation_inclusion_delay: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub slots_per_epoch: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub min_epochs_to_inactivity_penalty: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub base_reward_factor: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_reward_quotient: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_penalty_quotient: u64,
}

impl BasePreset {
    pub fn from_chain_spec(spec: &ChainSpec) -> Self {
        Self {
            max_effective_balance: spec.max_effective_balance,
            effective_balance_increment: spec.effective_balance_increment,
            hysteresis_quotient: spec.hysteresis_quotient,
            hysteresis_downward_multiplier: spec.hysteresis_downward_multiplier,
            hysteresis_upward_multiplier: spec.hysteresis_upward_multiplier,
            min_attestation_inclusion_delay: spec.min_attestation_inclusion_delay,
            slots_per_epoch: spec.slots_per_epoch,
            min_epochs_to_inactivity_penalty: spec.min_epochs_to_inactivity_penalty,
            base_reward_factor: spec.base_reward_factor,
            proposer_reward_quotient: spec.proposer_reward_quotient,
            inactivity_penalty_quotient: spec.inactivity_penalty_quotient,
        }
    }

    pub fn apply_to(&self, spec: &mut ChainSpec) {
        spec.max_effective_balance = self.max_effective_balance;
        spec.effective_balance_increment = self.effective_balance_increment;
        spec.hysteresis_quotient = self.hysteresis_quotient;
        spec.hysteresis_downward_multiplier = self.hysteresis_downward_multiplier;
        spec.hysteresis_upward_multiplier = self.hysteresis_upward_multiplier;
        spec.min_attestation_inclusion_delay = self.min_attestation_inclusion_delay;
        spec.slots_per_epoch = self.slots_per_epoch;
        spec.min_epochs_to_inactivity_penalty = self.min_epochs_to_inactivity_penalty;
        spec.base_reward_factor = self.base_reward_factor;
        spec.proposer_reward_quotient = self.proposer_reward_quotient;
        spec.inactivity_penalty_quotient = self.inactivity_penalty_quotient;
    }
}

/// Altair-era inactivity scoring values.
///
/// `MAX_INACTIVITY_SCORE` is optional in the file and defaults to no cap.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AltairPreset {
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_penalty_quotient_altair: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_score_bias: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub inactivity_score_recovery_rate: u64,
    #[serde(with = "serde_utils::quoted_u64", default = "default_max_inactivity_score")]
    pub max_inactivity_score: u64,
}

fn default_max_inactivity_score() -> u64 {
    u64::MAX
}

impl AltairPreset {
    pub fn from_chain_spec(spec: &ChainSpec) -> Self {
        Self {
            inactivity_penalty_quotient_altair: spec.inactivity_penalty_quotient_altair,
            inactivity_score_bias: spec.inactivity_score_bias,
            inactivity_score_recovery_rate: spec.inactivity_score_recovery_rate,
            max_inactivity_score: spec.max_inactivity_score,
        }
    }

    pub fn apply_to(&self, spec: &mut ChainSpec) {
        spec.inactivity_penalty_quotient_altair = self.inactivity_penalty_quotient_altair;
        spec.inactivity_score_bias = self.inactivity_score_bias;
        spec.inactivity_score_recovery_rate = self.inactivity_score_recovery_rate;
        spec.max_inactivity_score = self.max_inactivity_score;
    }
}
