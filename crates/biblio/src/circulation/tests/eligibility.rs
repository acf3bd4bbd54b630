use std::sync::Arc;

use super::common::*;
use crate::circulation::domain::{CopyId, MemberId};
use crate::circulation::eligibility::{EligibilityGuard, IneligibilityReason};
use crate::circulation::ledger::CopyLedger;
use crate::circulation::memory::InMemoryCirculation;

fn guard() -> EligibilityGuard {
    EligibilityGuard::new(policy().loan)
}

#[test]
fn fresh_copy_and_member_are_eligible() {
    let store = InMemoryCirculation::new();
    store.register(copy("c-001", "bk-moby-dick", 1)).expect("copy");

    let report = guard()
        .check(
            &store,
            &CopyId("c-001".to_string()),
            &MemberId("m-alice".to_string()),
            false,
        )
        .expect("check runs");

    assert!(report.is_eligible());
    assert!(report.reasons.is_empty());
}

#[test]
fn unknown_copy_is_reported() {
    let store = InMemoryCirculation::new();

    let report = guard()
        .check(
            &store,
            &CopyId("c-missing".to_string()),
            &MemberId("m-alice".to_string()),
            false,
        )
        .expect("check runs");

    assert_eq!(
        report.reasons,
        vec![IneligibilityReason::CopyNotFound {
            copy_id: CopyId("c-missing".to_string())
        }]
    );
}

#[test]
fn every_failed_check_is_collected() {
    let store = InMemoryCirculation::new();
    for (id, book, number) in [
        ("c-001", "bk-moby-dick", 1),
        ("c-002", "bk-moby-dick", 2),
        ("c-003", "bk-middlemarch", 1),
        ("c-004", "bk-middlemarch", 2),
    ] {
        store.register(copy(id, book, number)).expect("copy");
    }

    // The target copy is out, and the member already sits at the cap.
    seed_loan(&store, open_loan("loan-1", "c-001", "m-bob", at(2026, 4, 1, 9)));
    seed_loan(&store, open_loan("loan-2", "c-002", "m-alice", at(2026, 4, 1, 9)));
    seed_loan(&store, open_loan("loan-3", "c-003", "m-alice", at(2026, 4, 1, 9)));
    seed_loan(&store, open_loan("loan-4", "c-004", "m-alice", at(2026, 4, 1, 9)));

    let report = guard()
        .check(
            &store,
            &CopyId("c-001".to_string()),
            &MemberId("m-alice".to_string()),
            true,
        )
        .expect("check runs");

    assert!(!report.is_eligible());
    assert_eq!(report.reasons.len(), 3);
    assert!(matches!(
        report.reasons[0],
        IneligibilityReason::CopyUnavailable { .. }
    ));
    assert!(matches!(
        report.reasons[1],
        IneligibilityReason::LoanLimitReached { held: 3, limit: 3, .. }
    ));
    assert!(matches!(
        report.reasons[2],
        IneligibilityReason::MemberBlocked { .. }
    ));
}

#[test]
fn ledger_divergence_still_blocks_the_copy() {
    let store = InMemoryCirculation::new();
    store.register(copy("c-001", "bk-moby-dick", 1)).expect("copy");

    // Loan row exists but the ledger still says available: the cross-check
    // must refuse the copy rather than trust either side alone.
    use crate::circulation::store::LoanStore;
    store
        .insert(open_loan("loan-9", "c-001", "m-bob", at(2026, 4, 1, 9)))
        .expect("seed loan row");

    let report = guard()
        .check(
            &store,
            &CopyId("c-001".to_string()),
            &MemberId("m-alice".to_string()),
            false,
        )
        .expect("check runs");

    assert_eq!(
        report.reasons,
        vec![IneligibilityReason::CopyUnavailable {
            copy_id: CopyId("c-001".to_string())
        }]
    );
}

#[test]
fn guard_surfaces_store_unavailability() {
    let store = Arc::new(UnavailableStore);

    let result = guard().check(
        store.as_ref(),
        &CopyId("c-001".to_string()),
        &MemberId("m-alice".to_string()),
        false,
    );

    assert!(result.is_err());
}
