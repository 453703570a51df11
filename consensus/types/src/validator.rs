use crate::{ChainSpec, Epoch};
#[cfg(feature = "arbitrary-fuzz")]
use arbitrary::Arbitrary;
use serde::{Deserialize, Serialize};

/// The fields of a registry validator read by epoch accounting.
///
/// Keys, withdrawal credentials and anything else not needed to derive activity, eligibility or
/// rewards live with the registry owner and never reach this stage.
#[cfg_attr(feature = "arbitrary-fuzz", derive(Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        self.withdrawable_epoch <= epoch
    }

    /// An unslashed validator, active from `activation_epoch` onwards, which never exits.
    pub fn active_from(activation_epoch: Epoch, effective_balance: u64, spec: &ChainSpec) -> Self {
        Self {
            effective_balance,
            slashed: false,
            activation_epoch,
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
        }
    }
}

impl Default for Validator {
    /// Yields a "default" `Validator`. Primarily used for testing.
    fn default() -> Self {
        Self {
            effective_balance: 0,
            slashed: false,
            activation_epoch: Epoch::max_value(),
            exit_epoch: Epoch::max_value(),
            withdrawable_epoch: Epoch::max_value(),
        }
    }
}
