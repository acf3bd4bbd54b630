mod policy;
mod rules;

pub use policy::RiskLevel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{LoanRecord, MemberId};
use super::fees::GracePeriodPolicy;

/// Stateless scorer folding a member's full loan history into reliability
/// and repeat-offender metrics.
pub struct RiskScorer {
    grace: GracePeriodPolicy,
}

impl RiskScorer {
    pub fn new(grace: GracePeriodPolicy) -> Self {
        Self { grace }
    }

    pub fn profile(
        &self,
        member_id: MemberId,
        loans: &[LoanRecord],
        as_of: DateTime<Utc>,
    ) -> RiskProfile {
        let metrics = rules::aggregate(loans, &self.grace, as_of);
        let repeat_offender_score = rules::blend(&metrics);
        let risk_level = policy::classify(repeat_offender_score);

        RiskProfile {
            member_id,
            loans_considered: loans.len(),
            overdue_rate: metrics.overdue_rate,
            average_days_overdue: metrics.average_days_overdue,
            grace_violations: metrics.grace_violations,
            current_overdue_count: metrics.current_overdue_count,
            reliability_score: metrics.reliability_score,
            repeat_offender_score,
            risk_level,
        }
    }
}

/// Computed view over a member's borrowing history. Never persisted;
/// recomputed on demand from the loan store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub member_id: MemberId,
    pub loans_considered: usize,
    /// Percentage of all loans that went overdue, 0 with no history.
    pub overdue_rate: f64,
    /// Mean days overdue across the loans that were overdue at all.
    pub average_days_overdue: f64,
    /// Loans that ran past the grace window, ever.
    pub grace_violations: usize,
    /// Open loans overdue right now.
    pub current_overdue_count: usize,
    /// 0-100, higher is better; 100 with no history.
    pub reliability_score: u8,
    /// 0-100 blend of frequency, severity, persistence, and exposure.
    pub repeat_offender_score: u8,
    pub risk_level: RiskLevel,
}
