use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CopyId, LoanId, LoanRecord, MemberId};
use super::fees::{self, FeeAssessment, GracePeriodPolicy};

/// Wire view of a loan: the record plus its derived standing and the fee
/// accrued as of the reference instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub copy_id: CopyId,
    pub member_id: MemberId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub standing: &'static str,
    pub fee: FeeAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LoanView {
    pub fn from_record(
        loan: &LoanRecord,
        policy: &GracePeriodPolicy,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            loan_id: loan.id.clone(),
            copy_id: loan.copy_id.clone(),
            member_id: loan.member_id.clone(),
            borrowed_at: loan.borrowed_at,
            due_at: loan.due_at,
            returned_at: loan.returned_at,
            standing: loan.standing(as_of).label(),
            fee: fees::assess(loan, policy, as_of),
            notes: loan.notes.clone(),
        }
    }
}

/// One open loan past its due date, as listed by the overdue sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub loan_id: LoanId,
    pub copy_id: CopyId,
    pub member_id: MemberId,
    pub due_at: DateTime<Utc>,
    pub days_overdue: i64,
    pub accrued_fee: f64,
    pub within_grace: bool,
}

/// The decision that an overdue notice falls due today. Delivery belongs to
/// the notification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanNotice {
    pub loan_id: LoanId,
    pub copy_id: CopyId,
    pub member_id: MemberId,
    pub due_at: DateTime<Utc>,
    pub days_overdue: i64,
    /// The policy offset this notice corresponds to.
    pub offset: i64,
}

/// A member whose open loan has run past the auto-suspend horizon.
/// Enforcement is the member collaborator's call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionCandidate {
    pub member_id: MemberId,
    pub loan_id: LoanId,
    pub days_overdue: i64,
}
