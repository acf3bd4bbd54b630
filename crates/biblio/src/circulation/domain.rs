use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for one lendable copy of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopyId(pub String);

/// Identifier wrapper for a library member, owned by the member service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub String);

/// Identifier wrapper for a single loan episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub String);

impl fmt::Display for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lending state of a physical copy. Transitions happen exclusively through
/// the ledger's reserve/release operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Available,
    Borrowed,
}

impl CopyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CopyStatus::Available => "available",
            CopyStatus::Borrowed => "borrowed",
        }
    }
}

/// One physical copy of a catalog item. Created by the catalog collaborator,
/// status mutated only by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRecord {
    pub id: CopyId,
    pub book_id: String,
    pub copy_number: u32,
    pub status: CopyStatus,
}

impl CopyRecord {
    pub fn new(id: CopyId, book_id: impl Into<String>, copy_number: u32) -> Self {
        Self {
            id,
            book_id: book_id.into(),
            copy_number,
            status: CopyStatus::Available,
        }
    }
}

/// One loan episode. The record is append-only history: `returned_at` is the
/// only field that changes after creation, and only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub copy_id: CopyId,
    pub member_id: MemberId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl LoanRecord {
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Whole calendar days past due, never negative. Closed loans are
    /// measured against their return date, open loans against `as_of`, so a
    /// late return keeps accruing the same count it had on the day it came
    /// back.
    pub fn days_overdue_at(&self, as_of: DateTime<Utc>) -> i64 {
        let reference = self.returned_at.unwrap_or(as_of);
        let days = (reference.date_naive() - self.due_at.date_naive()).num_days();
        days.max(0)
    }

    /// Derived classification of the loan. `Overdue` is never persisted; it
    /// is recomputed from the due date on every read.
    pub fn standing(&self, as_of: DateTime<Utc>) -> LoanStanding {
        if self.is_returned() {
            LoanStanding::Returned
        } else if self.days_overdue_at(as_of) > 0 {
            LoanStanding::Overdue
        } else {
            LoanStanding::Active
        }
    }
}

/// Reporting classification of a loan at a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStanding {
    Active,
    Overdue,
    Returned,
}

impl LoanStanding {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStanding::Active => "active",
            LoanStanding::Overdue => "overdue",
            LoanStanding::Returned => "returned",
        }
    }
}
