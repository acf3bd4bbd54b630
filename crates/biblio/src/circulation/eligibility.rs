use serde::Serialize;

use super::domain::{CopyId, CopyStatus, MemberId};
use super::fees::LoanPolicy;
use super::store::{CirculationStore, StoreError};

/// A single failed borrow precondition, with the entity that failed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibilityReason {
    CopyNotFound {
        copy_id: CopyId,
    },
    CopyUnavailable {
        copy_id: CopyId,
    },
    LoanLimitReached {
        member_id: MemberId,
        held: usize,
        limit: usize,
    },
    MemberBlocked {
        member_id: MemberId,
    },
}

/// Every reason a borrow would be refused. Partial eligibility does not
/// exist: callers treat any non-empty list as a hard rejection.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityReport {
    pub reasons: Vec<IneligibilityReason>,
}

impl EligibilityReport {
    pub fn is_eligible(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Guard running the borrow preconditions. All checks run even after one
/// fails, so the report names everything the member would need to fix.
#[derive(Debug, Clone)]
pub struct EligibilityGuard {
    policy: LoanPolicy,
}

impl EligibilityGuard {
    pub fn new(policy: LoanPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Advisory pass over the preconditions. The commit re-validates the
    /// racy checks (copy availability, loan count) inside the store's
    /// critical section; this pass exists to give callers the full picture.
    /// `member_blocked` is the pre-fetched flag from the member
    /// collaborator.
    pub fn check<S>(
        &self,
        store: &S,
        copy_id: &CopyId,
        member_id: &MemberId,
        member_blocked: bool,
    ) -> Result<EligibilityReport, StoreError>
    where
        S: CirculationStore + ?Sized,
    {
        let mut reasons = Vec::new();

        match store.status(copy_id)? {
            None => reasons.push(IneligibilityReason::CopyNotFound {
                copy_id: copy_id.clone(),
            }),
            Some(CopyStatus::Borrowed) => reasons.push(IneligibilityReason::CopyUnavailable {
                copy_id: copy_id.clone(),
            }),
            Some(CopyStatus::Available) => {
                // Cross-check against the loan history in case the ledger
                // and the store have diverged.
                if store.open_loan_for_copy(copy_id)?.is_some() {
                    reasons.push(IneligibilityReason::CopyUnavailable {
                        copy_id: copy_id.clone(),
                    });
                }
            }
        }

        let held = store.open_loans_for_member(member_id)?.len();
        if held >= self.policy.max_active_loans {
            reasons.push(IneligibilityReason::LoanLimitReached {
                member_id: member_id.clone(),
                held,
                limit: self.policy.max_active_loans,
            });
        }

        if member_blocked {
            reasons.push(IneligibilityReason::MemberBlocked {
                member_id: member_id.clone(),
            });
        }

        Ok(EligibilityReport { reasons })
    }
}
