use serde::{Deserialize, Serialize};

/// Risk banding derived from the repeat-offender score. One threshold
/// table, used everywhere a loan or report needs a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

pub(crate) fn classify(repeat_offender_score: u8) -> RiskLevel {
    if repeat_offender_score >= 75 {
        RiskLevel::Critical
    } else if repeat_offender_score >= 50 {
        RiskLevel::High
    } else if repeat_offender_score >= 25 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
