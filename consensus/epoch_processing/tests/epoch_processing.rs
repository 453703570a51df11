mod common;

use common::{full, source_only, TestEpoch, GWEI};
use epoch_processing::{EpochProcessingError, InvariantViolation};
use safe_arith::ArithError;
use types::{
    ChainSpec, Epoch, EpochParticipation, ForkName, ParticipationFlags, RegistrySnapshot, Slot,
    Validator, ValidatorRegistry, ValidatorRegistryMut,
};

#[test]
fn one_validator_misses_target() {
    let mut test = TestEpoch::new(
        ChainSpec::minimal(),
        &[32 * GWEI, 32 * GWEI, 16 * GWEI, 32 * GWEI],
        2,
    );
    for i in [0, 1, 3] {
        test.attest_previous(i, full(), 1, 0);
    }
    test.attest_previous(2, source_only(), 1, 0);

    let transition = test.process().unwrap();
    let totals = transition.summary().total_balances();
    assert_eq!(
        totals.raw_previous_epoch_target_attesters(),
        u128::from(96 * GWEI)
    );
    assert_eq!(totals.raw_previous_epoch(), u128::from(112 * GWEI));
    assert_eq!(
        totals.raw_previous_epoch_source_attesters(),
        u128::from(112 * GWEI)
    );
    assert_eq!(
        totals.raw_previous_epoch_head_attesters(),
        u128::from(96 * GWEI)
    );

    let deltas = transition.deltas();
    assert_eq!(deltas[2].target_delta.rewards, 0);
    assert!(deltas[2].target_delta.penalties > 0);
    assert!(deltas[2].source_delta.rewards > 0);

    for i in [0, 1, 3] {
        for component in [
            deltas[i].source_delta,
            deltas[i].target_delta,
            deltas[i].head_delta,
        ] {
            assert!(component.rewards > 0, "validator {} should be rewarded", i);
            assert_eq!(component.penalties, 0);
        }
    }

    let summary = transition.summary();
    assert!(summary.is_previous_epoch_source_attester(2));
    assert!(!summary.is_previous_epoch_target_attester(2));
    assert!(summary.is_previous_epoch_head_attester(3));
    assert!(!summary.is_previous_epoch_head_attester(4));
    assert!(summary.previous_epoch_inclusion_info(4).is_none());
}

#[test]
fn earlier_inclusion_earns_more() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 4], 3);
    test.attest_previous(0, full(), 1, 2);
    test.attest_previous(1, full(), 5, 3);

    let transition = test.process().unwrap();
    let deltas = transition.deltas();

    assert!(deltas[0].inclusion_delay_delta.rewards > deltas[1].inclusion_delay_delta.rewards);
    assert!(deltas[1].inclusion_delay_delta.rewards > 0);
    // The proposer share is a flat `base_reward / proposer_reward_quotient` whatever the
    // inclusion distance; only the attester's share shrinks with distance. Identical validators
    // therefore earn their proposers the same credit.
    assert!(deltas[2].proposer_delta.rewards > 0);
    assert_eq!(
        deltas[2].proposer_delta.rewards,
        deltas[3].proposer_delta.rewards
    );
    assert_eq!(deltas[0].proposer_delta.rewards, 0);

    let info = transition.summary().previous_epoch_inclusion_info(1).unwrap();
    assert_eq!(info.delay, 5);
    assert_eq!(info.proposer_index, 3);
}

#[test]
fn wrong_source_vote_earns_no_inclusion() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 3], 3);
    test.attest_previous(0, ParticipationFlags::new(false, false, false), 1, 1);
    test.attest_previous(0, full(), 3, 2);

    let transition = test.process().unwrap();
    let deltas = transition.deltas();

    let info = transition.summary().previous_epoch_inclusion_info(0).unwrap();
    assert_eq!(info.delay, 3);
    assert_eq!(info.proposer_index, 2);

    assert_eq!(deltas[1].proposer_delta.rewards, 0);
    assert!(deltas[2].proposer_delta.rewards > 0);

    // Same attester at distance 3 only.
    let mut reference = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 3], 3);
    reference.attest_previous(0, full(), 3, 2);
    let expected = reference.process().unwrap();
    assert_eq!(
        deltas[0].inclusion_delay_delta,
        expected.deltas()[0].inclusion_delay_delta
    );
}

#[test]
fn small_balance_increase_keeps_effective_balance() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[16 * GWEI, 32 * GWEI], 3);
    test.attest_previous(0, full(), 1, 1);
    test.attest_previous(1, full(), 1, 0);

    let transition = test.process().unwrap();
    let balance = transition.balances()[0];
    assert!(balance.after > balance.before);
    assert!(balance.change() > 0);
    assert_eq!(transition.effective_balances()[0], 16 * GWEI);
}

#[test]
fn large_balance_change_moves_effective_balance() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[16 * GWEI, 32 * GWEI], 3);
    *test.registry.get_balance_mut(0).unwrap() = 20 * GWEI + GWEI / 2;
    *test.registry.get_balance_mut(1).unwrap() = 30 * GWEI;

    let transition = test.process().unwrap();
    // Neither attested, so both balances drop a little below their starting values.
    assert_eq!(transition.effective_balances(), &[20 * GWEI, 29 * GWEI]);
}

#[test]
fn genesis_epoch_has_no_deltas() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 3], 0);
    test.attest_previous(0, full(), 1, 1);

    let transition = test.process().unwrap();
    assert!(transition
        .deltas()
        .iter()
        .all(|delta| *delta == Default::default()));
    assert!(transition
        .balances()
        .iter()
        .all(|balance| balance.before == balance.after));
    assert_eq!(transition.inactivity_scores(), &[0, 0, 0]);
}

#[test]
fn inactivity_score_feeds_next_epoch() {
    let spec = ForkName::Altair.make_genesis_spec(ChainSpec::minimal());
    let mut test = TestEpoch::new(spec, &[32 * GWEI; 2], 10);
    test.finalized_epoch = Epoch::new(0);
    test.attest_previous(0, full(), 1, 0);
    assert!(test.context().unwrap().is_in_inactivity_leak());

    let transition = test.process().unwrap();
    // The score is read before it is updated, so no leak penalty yet.
    assert_eq!(transition.deltas()[1].inactivity_penalty_delta.penalties, 0);
    assert_eq!(transition.inactivity_scores(), &[0, 4]);
    // Altair pays nothing for correct votes during a leak.
    assert_eq!(transition.deltas()[0].target_delta.rewards, 0);

    transition.commit(&mut test.registry).unwrap();
    assert_eq!(test.registry.inactivity_scores(), &[0, 4]);

    test.current_epoch = Epoch::new(11);
    test.previous = EpochParticipation::new(2);
    test.attest_previous(0, full(), 1, 0);
    let transition = test.process().unwrap();
    assert_eq!(
        transition.deltas()[1].inactivity_penalty_delta.penalties,
        32 * GWEI * 4 / (4 * test.spec.inactivity_penalty_quotient_altair)
    );
    assert_eq!(transition.inactivity_scores(), &[0, 8]);
}

#[test]
fn base_leak_penalizes_by_finality_delay() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 10);
    test.finalized_epoch = Epoch::new(0);
    test.attest_previous(0, full(), 1, 0);

    let transition = test.process().unwrap();
    let ctx = transition.context();
    assert_eq!(ctx.finality_delay(), 9);

    let attester = transition.deltas()[0].inactivity_penalty_delta.penalties;
    let absentee = transition.deltas()[1].inactivity_penalty_delta.penalties;
    assert_eq!(
        absentee - attester,
        32 * GWEI * 9 / test.spec.inactivity_penalty_quotient
    );
    // Scores are not used before Altair.
    assert_eq!(transition.inactivity_scores(), &[0, 0]);
}

#[test]
fn slashed_validator_is_penalized_until_withdrawable() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 3], 4);
    {
        let validator = test.registry.get_validator_mut(2).unwrap();
        validator.slashed = true;
        validator.exit_epoch = Epoch::new(2);
        validator.withdrawable_epoch = Epoch::new(10);
    }
    test.attest_previous(0, full(), 1, 1);
    test.attest_previous(1, full(), 1, 0);

    let transition = test.process().unwrap();
    let delta = transition.deltas()[2];
    assert!(delta.source_delta.penalties > 0);
    assert_eq!(delta.source_delta.rewards, 0);
    assert!(transition.balances()[2].after < transition.balances()[2].before);

    test.registry.get_validator_mut(2).unwrap().withdrawable_epoch = Epoch::new(4);
    let transition = test.process().unwrap();
    assert_eq!(transition.deltas()[2], Default::default());
}

#[test]
fn commit_writes_all_fields() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    test.attest_previous(0, full(), 1, 1);

    let transition = test.process().unwrap();
    let balances: Vec<u64> = transition.balances().iter().map(|b| b.after).collect();
    let effective_balances = transition.effective_balances().to_vec();

    let summary = transition.commit(&mut test.registry).unwrap();
    assert_eq!(test.registry.balances(), balances.as_slice());
    for (validator, effective_balance) in test.registry.validators().iter().zip(effective_balances)
    {
        assert_eq!(validator.effective_balance, effective_balance);
    }
    assert!(summary.is_active_in_previous_epoch(1));
}

#[test]
fn commit_onto_wrong_length_writes_nothing() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 4], 3);
    test.attest_previous(0, full(), 1, 1);
    let transition = test.process().unwrap();

    let mut other = test.registry.clone();
    other.push(
        Validator::active_from(Epoch::new(0), 32 * GWEI, &test.spec),
        32 * GWEI,
    );
    let before = other.clone();

    assert_eq!(
        transition.clone().commit(&mut other),
        Err(EpochProcessingError::IndexOutOfRange { index: 4, len: 4 })
    );
    assert_eq!(other, before);

    let mut short = RegistrySnapshot::default();
    assert_eq!(
        transition.commit(&mut short),
        Err(EpochProcessingError::IndexOutOfRange { index: 3, len: 0 })
    );
    assert_eq!(short, RegistrySnapshot::default());
}

#[test]
fn processing_is_deterministic() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 64], 5);
    for i in 0..64 {
        match i % 4 {
            0 => test.attest_previous(i, full(), 1 + (i as u64 % 3), (i as u64 * 7) % 64),
            1 => test.attest_previous(i, source_only(), 2, 5),
            2 => test.attest_current(i, ParticipationFlags::new(true, true, false)),
            _ => {}
        }
    }
    assert_eq!(test.process().unwrap(), test.process().unwrap());
}

/*
 * Errors
 */

#[test]
fn proposer_out_of_range() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 4], 3);
    test.attest_previous(1, full(), 1, 99);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::IndexOutOfRange { index: 99, len: 4 })
    );
}

/// Claims one more validator than it can return.
struct OverstatedRegistry(RegistrySnapshot);

impl ValidatorRegistry for OverstatedRegistry {
    fn num_validators(&self) -> usize {
        self.0.num_validators() + 1
    }

    fn get_validator(&self, index: usize) -> Option<&Validator> {
        self.0.get_validator(index)
    }

    fn get_balance(&self, index: usize) -> Option<u64> {
        self.0.get_balance(index)
    }

    fn get_inactivity_score(&self, index: usize) -> Option<u64> {
        self.0.get_inactivity_score(index)
    }
}

#[test]
fn registry_entry_out_of_range() {
    let test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    let result = epoch_processing::process_epoch(
        &OverstatedRegistry(test.registry.clone()),
        &EpochParticipation::new(3),
        &EpochParticipation::new(3),
        &test.context().unwrap(),
        &test.spec,
        &logging::test_logger(),
    );
    assert_eq!(
        result,
        Err(EpochProcessingError::IndexOutOfRange { index: 2, len: 3 })
    );
}

#[test]
fn invalid_effective_balance() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    test.registry.get_validator_mut(1).unwrap().effective_balance = 31 * GWEI + 1;
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::InvalidEffectiveBalance {
                validator_index: 1,
                effective_balance: 31 * GWEI + 1,
            }
        ))
    );

    test.registry.get_validator_mut(1).unwrap().effective_balance = 33 * GWEI;
    assert!(matches!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::InvalidEffectiveBalance { .. }
        ))
    ));
}

#[test]
fn broken_implication_chain() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    let flags = ParticipationFlags::new(true, false, true);
    test.attest_previous(0, flags, 1, 1);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::InconsistentParticipationFlags {
                validator_index: 0,
                epoch: Epoch::new(2),
                flags,
            }
        ))
    );
}

#[test]
fn zero_inclusion_distance() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    test.attest_previous(1, full(), 0, 0);
    let slot = Epoch::new(2).start_slot(test.spec.slots_per_epoch);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::InvalidInclusion {
                validator_index: 1,
                attestation_slot: slot,
                inclusion_slot: slot,
            }
        ))
    );
}

#[test]
fn inclusion_before_minimum_delay() {
    let mut spec = ChainSpec::minimal();
    spec.min_attestation_inclusion_delay = 2;
    let mut test = TestEpoch::new(spec, &[32 * GWEI; 2], 3);
    test.attest_previous(1, full(), 1, 0);
    assert!(matches!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::InvalidInclusion {
                validator_index: 1,
                ..
            }
        ))
    ));
}

#[test]
fn inactive_attester() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    test.registry.get_validator_mut(1).unwrap().activation_epoch = Epoch::new(3);
    test.attest_previous(1, full(), 1, 0);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::InvariantViolation(
            InvariantViolation::AttesterNotActive {
                validator_index: 1,
                epoch: Epoch::new(2),
            }
        ))
    );
}

#[test]
fn missing_participation() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 4], 3);
    test.previous = EpochParticipation::new(3);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::MissingParticipationData {
            validator_index: 3,
            epoch: Epoch::new(2),
        })
    );
}

#[test]
fn balance_overflow() {
    let mut test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI; 2], 3);
    *test.registry.get_balance_mut(0).unwrap() = u64::MAX;
    test.attest_previous(0, full(), 1, 1);
    assert_eq!(
        test.process(),
        Err(EpochProcessingError::ArithmeticOverflow(ArithError::Overflow))
    );
}

#[test]
fn inclusion_slot_helper_matches_delay() {
    let test = TestEpoch::new(ChainSpec::minimal(), &[32 * GWEI], 3);
    let record = test.previous_record(full(), 3, 0);
    assert_eq!(record.attestation_slot, Slot::new(16));
    assert_eq!(record.inclusion_delay(), Some(3));
}
