use crate::{AltairPreset, BasePreset, Epoch, ForkName};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Holds all the "constants" read by the epoch accounting stage.
///
/// A `ChainSpec` is always passed explicitly into each component rather than read from a global,
/// so that the same pipeline can be run against different constant sets.
#[derive(PartialEq, Debug, Clone)]
pub struct ChainSpec {
    /*
     * Constants
     */
    pub genesis_epoch: Epoch,
    pub far_future_epoch: Epoch,
    pub base_rewards_per_epoch: u64,

    /*
     * Gwei values
     */
    pub max_effective_balance: u64,
    pub effective_balance_increment: u64,

    /*
     * Effective balance hysteresis
     */
    pub hysteresis_quotient: u64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    /*
     * Time parameters
     */
    pub slots_per_epoch: u64,
    pub min_attestation_inclusion_delay: u64,
    pub min_epochs_to_inactivity_penalty: u64,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_factor: u64,
    pub proposer_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,

    /*
     * Altair inactivity scoring
     */
    pub inactivity_penalty_quotient_altair: u64,
    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,
    /// Upper bound applied when an inactivity score is increased.
    pub max_inactivity_score: u64,

    /*
     * Fork schedule
     */
    pub altair_fork_epoch: Option<Epoch>,
}

impl ChainSpec {
    /// Returns the name of the fork which is active at `epoch`.
    pub fn fork_name_at_epoch(&self, epoch: Epoch) -> ForkName {
        match self.altair_fork_epoch {
            Some(fork_epoch) if epoch >= fork_epoch => ForkName::Altair,
            _ => ForkName::Base,
        }
    }

    /// For a given fork name, return the quotient used by the leak penalty of that fork.
    pub fn inactivity_penalty_quotient_for_fork(&self, fork_name: ForkName) -> u64 {
        match fork_name {
            ForkName::Base => self.inactivity_penalty_quotient,
            ForkName::Altair => self.inactivity_penalty_quotient_altair,
        }
    }

    /// Returns a `ChainSpec` compatible with the Ethereum Foundation mainnet specification.
    pub fn mainnet() -> Self {
        Self {
            /*
             * Constants
             */
            genesis_epoch: Epoch::new(0),
            far_future_epoch: Epoch::max_value(),
            base_rewards_per_epoch: 4,

            /*
             * Gwei values
             */
            max_effective_balance: u64::pow(2, 5) * u64::pow(10, 9),
            effective_balance_increment: u64::pow(10, 9),

            /*
             * Effective balance hysteresis
             */
            hysteresis_quotient: 4,
            hysteresis_downward_multiplier: 1,
            hysteresis_upward_multiplier: 5,

            /*
             * Time parameters
             */
            slots_per_epoch: 32,
            min_attestation_inclusion_delay: 1,
            min_epochs_to_inactivity_penalty: 4,

            /*
             * Reward and penalty quotients
             */
            base_reward_factor: 64,
            proposer_reward_quotient: 8,
            inactivity_penalty_quotient: u64::pow(2, 26),

            /*
             * Altair inactivity scoring
             */
            inactivity_penalty_quotient_altair: 3 * u64::pow(2, 24),
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,
            max_inactivity_score: u64::MAX,

            /*
             * Fork schedule
             */
            altair_fork_epoch: Some(Epoch::new(74240)),
        }
    }

    /// Ethereum Foundation minimal preset, with small committees and short epochs.
    pub fn minimal() -> Self {
        Self {
            slots_per_epoch: 8,
            inactivity_penalty_quotient: u64::pow(2, 25),
            altair_fork_epoch: None,
            ..ChainSpec::mainnet()
        }
    }

    /// Loads `phase0.yaml` and `altair.yaml` from `dir` and applies them on top of `base`.
    ///
    /// Values which are not part of a preset (e.g. the fork schedule) are kept from `base`.
    pub fn from_preset_files(base: ChainSpec, dir: &Path) -> Result<Self, String> {
        let phase0: BasePreset = read_yaml(&dir.join("phase0.yaml"))?;
        let altair: AltairPreset = read_yaml(&dir.join("altair.yaml"))?;

        let mut spec = base;
        phase0.apply_to(&mut spec);
        altair.apply_to(&mut spec);
        Ok(spec)
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let file = File::open(path)
        .map_err(|e| format!("Unable to open preset file {}: {:?}", path.display(), e))?;
    serde_yaml::from_reader(file)
        .map_err(|e| format!("Unable to parse preset file {}: {:?}", path.display(), e))
}
