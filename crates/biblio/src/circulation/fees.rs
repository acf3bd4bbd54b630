use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::LoanRecord;

/// Late-fee and notification dials applied once a loan passes its due date.
/// Constructed explicitly and passed in; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GracePeriodPolicy {
    /// Days past due during which no fee accrues.
    pub grace_period_days: i64,
    /// Flat fee charged on the first billable day after the grace window.
    pub base_late_fee: f64,
    /// Per-day fee for every billable day after the first.
    pub daily_late_fee: f64,
    /// Ceiling on the accrued fee for a single loan.
    pub max_late_fee: f64,
    /// Days-after-due at which an overdue notice falls due.
    pub notification_offsets: Vec<i64>,
    /// Days past due after which the member becomes a suspension candidate.
    pub auto_suspend_days: i64,
}

impl Default for GracePeriodPolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 3,
            base_late_fee: 1.0,
            daily_late_fee: 0.5,
            max_late_fee: 25.0,
            notification_offsets: vec![1, 3, 7, 14],
            auto_suspend_days: 30,
        }
    }
}

/// Borrowing limits applied before a loan is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    pub loan_period_days: i64,
    pub max_active_loans: usize,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: 14,
            max_active_loans: 3,
        }
    }
}

/// Full policy bundle handed to the circulation service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CirculationPolicy {
    pub loan: LoanPolicy,
    pub grace: GracePeriodPolicy,
}

/// Outcome of assessing one loan against the grace policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAssessment {
    pub days_overdue: i64,
    pub amount: f64,
    pub within_grace: bool,
    /// Grace days left before fees start. `None` for closed loans, where
    /// the window no longer means anything.
    pub grace_remaining: Option<i64>,
}

/// Pure assessment of a loan at a reference instant. Closed loans are
/// evaluated against their return date regardless of `as_of`, so a
/// late-returned loan carries the same fee forever after.
pub fn assess(loan: &LoanRecord, policy: &GracePeriodPolicy, as_of: DateTime<Utc>) -> FeeAssessment {
    let days_overdue = loan.days_overdue_at(as_of);
    let within_grace = days_overdue <= policy.grace_period_days;

    let grace_remaining = if loan.is_returned() {
        None
    } else if within_grace {
        Some(policy.grace_period_days - days_overdue)
    } else {
        Some(0)
    };

    FeeAssessment {
        days_overdue,
        amount: late_fee(days_overdue, policy),
        within_grace,
        grace_remaining,
    }
}

/// Fee schedule: zero through the grace window, the base fee on the first
/// billable day, the daily rate for each day after, capped at the maximum.
pub fn late_fee(days_overdue: i64, policy: &GracePeriodPolicy) -> f64 {
    if days_overdue <= policy.grace_period_days {
        return 0.0;
    }

    let billable = days_overdue - policy.grace_period_days;
    let fee = policy.base_late_fee + (billable - 1) as f64 * policy.daily_late_fee;
    fee.min(policy.max_late_fee)
}
