use chrono::{DateTime, Utc};

use super::super::domain::LoanRecord;
use super::super::fees::GracePeriodPolicy;

pub(crate) struct HistoryMetrics {
    pub overdue_rate: f64,
    pub average_days_overdue: f64,
    pub grace_violations: usize,
    pub current_overdue_count: usize,
    pub reliability_score: u8,
}

pub(crate) fn aggregate(
    loans: &[LoanRecord],
    grace: &GracePeriodPolicy,
    as_of: DateTime<Utc>,
) -> HistoryMetrics {
    if loans.is_empty() {
        return HistoryMetrics {
            overdue_rate: 0.0,
            average_days_overdue: 0.0,
            grace_violations: 0,
            current_overdue_count: 0,
            reliability_score: 100,
        };
    }

    let mut overdue_days = Vec::new();
    let mut grace_violations = 0;
    let mut current_overdue_count = 0;

    for loan in loans {
        let days = loan.days_overdue_at(as_of);
        if days > 0 {
            overdue_days.push(days);
        }
        if days > grace.grace_period_days {
            grace_violations += 1;
        }
        if loan.is_open() && days > 0 {
            current_overdue_count += 1;
        }
    }

    let overdue_rate = 100.0 * overdue_days.len() as f64 / loans.len() as f64;
    let average_days_overdue = if overdue_days.is_empty() {
        0.0
    } else {
        overdue_days.iter().sum::<i64>() as f64 / overdue_days.len() as f64
    };
    let reliability_score = (100.0 - overdue_rate).round().clamp(0.0, 100.0) as u8;

    HistoryMetrics {
        overdue_rate,
        average_days_overdue,
        grace_violations,
        current_overdue_count,
        reliability_score,
    }
}

/// Blended 0-100 repeat-offender score. The 40/30/20/10 weights and the
/// 30-day / 5-violation / 3-concurrent caps define the score's scale and
/// must move together if the policy ever changes.
pub(crate) fn blend(metrics: &HistoryMetrics) -> u8 {
    let frequency = 0.4 * metrics.overdue_rate;
    let severity = 0.3 * (metrics.average_days_overdue / 30.0).min(1.0) * 100.0;
    let persistence = 0.2 * (metrics.grace_violations as f64 / 5.0).min(1.0) * 100.0;
    let exposure = 0.1 * (metrics.current_overdue_count as f64 / 3.0).min(1.0) * 100.0;

    (frequency + severity + persistence + exposure)
        .min(100.0)
        .round() as u8
}
