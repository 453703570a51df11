use crate::ChainSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The protocol rule sets understood by the epoch accounting stage.
///
/// `Base` applies the flat inactivity leak driven by the finality delay. `Altair` replaces it with
/// the per-validator inactivity score carried in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ForkName {
    Base,
    Altair,
}

impl ForkName {
    /// Set the activation epochs in the given `ChainSpec` so that the fork named by `self`
    /// is the only fork in effect from genesis.
    pub fn make_genesis_spec(&self, mut spec: ChainSpec) -> ChainSpec {
        spec.altair_fork_epoch = match self {
            ForkName::Base => None,
            ForkName::Altair => Some(spec.genesis_epoch),
        };
        spec
    }

    /// Returns `true` if this fork penalizes leaking validators by inactivity score and keeps
    /// those scores up to date at each epoch boundary.
    pub fn uses_inactivity_scores(self) -> bool {
        match self {
            ForkName::Base => false,
            ForkName::Altair => true,
        }
    }
}

impl FromStr for ForkName {
    type Err = String;

    fn from_str(fork_name: &str) -> Result<Self, String> {
        Ok(match fork_name.to_lowercase().as_str() {
            "phase0" | "base" => ForkName::Base,
            "altair" => ForkName::Altair,
            _ => return Err(format!("unknown fork name: {}", fork_name)),
        })
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ForkName::Base => "phase0".fmt(f),
            ForkName::Altair => "altair".fmt(f),
        }
    }
}

impl From<ForkName> for String {
    fn from(fork: ForkName) -> String {
        fork.to_string()
    }
}

impl TryFrom<String> for ForkName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}
