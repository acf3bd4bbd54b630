use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{CopyId, LoanId, LoanRecord, MemberId};
use super::eligibility::{EligibilityGuard, EligibilityReport, IneligibilityReason};
use super::fees::{self, CirculationPolicy, FeeAssessment, GracePeriodPolicy};
use super::members::MemberDirectory;
use super::report::{LoanNotice, LoanView, OverdueEntry, SuspensionCandidate};
use super::risk::{RiskProfile, RiskScorer};
use super::store::{CirculationError, CirculationStore};

/// Service composing the eligibility guard, the store's atomic commits, and
/// the fee/risk engines. Borrow and return are the only mutating paths.
pub struct CirculationService<S, M> {
    store: Arc<S>,
    members: Arc<M>,
    guard: EligibilityGuard,
    scorer: RiskScorer,
    policy: CirculationPolicy,
}

static LOAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_loan_id() -> LoanId {
    let id = LOAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LoanId(format!("loan-{id:06}"))
}

fn rejection_for(reason: IneligibilityReason) -> CirculationError {
    match reason {
        IneligibilityReason::CopyNotFound { copy_id } => CirculationError::CopyNotFound(copy_id),
        IneligibilityReason::CopyUnavailable { copy_id } => {
            CirculationError::CopyUnavailable(copy_id)
        }
        IneligibilityReason::LoanLimitReached {
            member_id,
            held,
            limit,
        } => CirculationError::LoanLimitExceeded {
            member: member_id,
            held,
            limit,
        },
        IneligibilityReason::MemberBlocked { member_id } => {
            CirculationError::MemberBlocked(member_id)
        }
    }
}

impl<S, M> CirculationService<S, M>
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    pub fn new(store: Arc<S>, members: Arc<M>, policy: CirculationPolicy) -> Self {
        let guard = EligibilityGuard::new(policy.loan);
        let scorer = RiskScorer::new(policy.grace.clone());

        Self {
            store,
            members,
            guard,
            scorer,
            policy,
        }
    }

    pub fn policy(&self) -> &CirculationPolicy {
        &self.policy
    }

    /// Opens a loan for the member on the given copy. Eligibility is checked
    /// up front for a complete rejection, then re-validated by the store
    /// inside the same atomic unit that reserves the copy and inserts the
    /// loan, closing the check-then-act race.
    pub fn borrow(
        &self,
        copy_id: CopyId,
        member_id: MemberId,
        loan_period_days: Option<i64>,
    ) -> Result<LoanRecord, CirculationError> {
        let period = loan_period_days.unwrap_or(self.policy.loan.loan_period_days);
        if period <= 0 {
            return Err(CirculationError::InvalidLoanPeriod(period));
        }

        if !self.members.member_exists(&member_id)? {
            return Err(CirculationError::MemberNotFound(member_id));
        }
        let blocked = self.members.is_blocked(&member_id)?;

        let report = self
            .guard
            .check(self.store.as_ref(), &copy_id, &member_id, blocked)?;
        if let Some(reason) = report.reasons.into_iter().next() {
            return Err(rejection_for(reason));
        }

        let now = Utc::now();
        let loan = LoanRecord {
            id: next_loan_id(),
            copy_id,
            member_id,
            borrowed_at: now,
            due_at: now + Duration::days(period),
            returned_at: None,
            notes: None,
        };

        let stored = self
            .store
            .commit_borrow(loan, self.policy.loan.max_active_loans)?;
        info!(
            loan_id = %stored.id,
            copy_id = %stored.copy_id,
            member_id = %stored.member_id,
            due_at = %stored.due_at,
            "loan opened"
        );
        Ok(stored)
    }

    /// Closes a loan and frees its copy. Returning after the due date is not
    /// an error; the fee simply comes out positive when assessed.
    pub fn return_loan(
        &self,
        loan_id: &LoanId,
        notes: Option<String>,
    ) -> Result<LoanRecord, CirculationError> {
        let returned = self.store.commit_return(loan_id, Utc::now(), notes)?;
        let assessed = fees::assess(
            &returned,
            &self.policy.grace,
            returned.returned_at.unwrap_or_else(Utc::now),
        );
        info!(
            loan_id = %returned.id,
            copy_id = %returned.copy_id,
            days_overdue = assessed.days_overdue,
            fee = assessed.amount,
            "loan closed"
        );
        Ok(returned)
    }

    /// Full precondition report for a would-be borrow, without committing
    /// anything.
    pub fn eligibility(
        &self,
        copy_id: &CopyId,
        member_id: &MemberId,
    ) -> Result<EligibilityReport, CirculationError> {
        if !self.members.member_exists(member_id)? {
            return Err(CirculationError::MemberNotFound(member_id.clone()));
        }
        let blocked = self.members.is_blocked(member_id)?;
        Ok(self
            .guard
            .check(self.store.as_ref(), copy_id, member_id, blocked)?)
    }

    pub fn active_loans_for_member(
        &self,
        member_id: &MemberId,
    ) -> Result<Vec<LoanRecord>, CirculationError> {
        Ok(self.store.open_loans_for_member(member_id)?)
    }

    pub fn active_loan_for_copy(
        &self,
        copy_id: &CopyId,
    ) -> Result<Option<LoanRecord>, CirculationError> {
        if self.store.get(copy_id)?.is_none() {
            return Err(CirculationError::CopyNotFound(copy_id.clone()));
        }
        Ok(self.store.open_loan_for_copy(copy_id)?)
    }

    /// Assesses the late fee on a loan, open or closed. The grace policy can
    /// be overridden per call for what-if queries.
    pub fn assess_fee(
        &self,
        loan_id: &LoanId,
        as_of: Option<DateTime<Utc>>,
        policy: Option<&GracePeriodPolicy>,
    ) -> Result<FeeAssessment, CirculationError> {
        let loan = self
            .store
            .fetch(loan_id)?
            .ok_or_else(|| CirculationError::LoanNotFound(loan_id.clone()))?;
        let grace = policy.unwrap_or(&self.policy.grace);
        Ok(fees::assess(&loan, grace, as_of.unwrap_or_else(Utc::now)))
    }

    pub fn loan_view(
        &self,
        loan_id: &LoanId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<LoanView, CirculationError> {
        let loan = self
            .store
            .fetch(loan_id)?
            .ok_or_else(|| CirculationError::LoanNotFound(loan_id.clone()))?;
        Ok(LoanView::from_record(
            &loan,
            &self.policy.grace,
            as_of.unwrap_or_else(Utc::now),
        ))
    }

    pub fn risk_profile(
        &self,
        member_id: &MemberId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RiskProfile, CirculationError> {
        if !self.members.member_exists(member_id)? {
            return Err(CirculationError::MemberNotFound(member_id.clone()));
        }
        let history = self.store.history_for_member(member_id)?;
        Ok(self.scorer.profile(
            member_id.clone(),
            &history,
            as_of.unwrap_or_else(Utc::now),
        ))
    }

    /// Every open loan past its due date, worst first.
    pub fn list_overdue(
        &self,
        as_of: Option<DateTime<Utc>>,
        policy: Option<&GracePeriodPolicy>,
    ) -> Result<Vec<OverdueEntry>, CirculationError> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let grace = policy.unwrap_or(&self.policy.grace);

        let mut entries: Vec<OverdueEntry> = self
            .store
            .open_loans()?
            .into_iter()
            .filter(|loan| loan.days_overdue_at(as_of) > 0)
            .map(|loan| {
                let assessed = fees::assess(&loan, grace, as_of);
                OverdueEntry {
                    loan_id: loan.id,
                    copy_id: loan.copy_id,
                    member_id: loan.member_id,
                    due_at: loan.due_at,
                    days_overdue: assessed.days_overdue,
                    accrued_fee: assessed.amount,
                    within_grace: assessed.within_grace,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue).then(a.loan_id.cmp(&b.loan_id)));
        Ok(entries)
    }

    /// Open loans sitting exactly on one of the policy's notification
    /// offsets today. Callers own delivery; this is only the decision.
    pub fn notices_due(
        &self,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<LoanNotice>, CirculationError> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let offsets = &self.policy.grace.notification_offsets;

        let mut notices = Vec::new();
        for loan in self.store.open_loans()? {
            let days = loan.days_overdue_at(as_of);
            if days > 0 && offsets.contains(&days) {
                notices.push(LoanNotice {
                    loan_id: loan.id,
                    copy_id: loan.copy_id,
                    member_id: loan.member_id,
                    due_at: loan.due_at,
                    days_overdue: days,
                    offset: days,
                });
            }
        }
        Ok(notices)
    }

    /// Members with an open loan at or beyond the auto-suspend horizon, one
    /// entry per member carrying their worst loan.
    pub fn suspension_candidates(
        &self,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<SuspensionCandidate>, CirculationError> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let horizon = self.policy.grace.auto_suspend_days;

        let mut worst: BTreeMap<MemberId, SuspensionCandidate> = BTreeMap::new();
        for loan in self.store.open_loans()? {
            let days = loan.days_overdue_at(as_of);
            if days >= horizon {
                let candidate = SuspensionCandidate {
                    member_id: loan.member_id.clone(),
                    loan_id: loan.id,
                    days_overdue: days,
                };
                match worst.entry(loan.member_id) {
                    Entry::Occupied(mut slot) => {
                        if candidate.days_overdue > slot.get().days_overdue {
                            slot.insert(candidate);
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    }
                }
            }
        }
        Ok(worst.into_values().collect())
    }
}
