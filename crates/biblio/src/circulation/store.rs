use chrono::{DateTime, Utc};

use super::domain::{CopyId, LoanId, LoanRecord, MemberId};
use super::ledger::{CopyLedger, LedgerError};
use super::members::DirectoryError;

/// Error enumeration for store infrastructure failures. Distinct from
/// [`CirculationError`]: these describe the store itself misbehaving, not a
/// business rule firing, so callers can decide whether a retry makes sense.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of loan episodes, queryable by loan, copy, and member.
/// Loans are never deleted; the full history feeds the risk scorer.
pub trait LoanStore: Send + Sync {
    fn insert(&self, loan: LoanRecord) -> Result<LoanRecord, StoreError>;
    fn update(&self, loan: LoanRecord) -> Result<(), StoreError>;
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, StoreError>;
    fn open_loan_for_copy(&self, copy_id: &CopyId) -> Result<Option<LoanRecord>, StoreError>;
    fn open_loans_for_member(&self, member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError>;
    fn history_for_member(&self, member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError>;
    fn open_loans(&self) -> Result<Vec<LoanRecord>, StoreError>;
}

/// Combined seam the lifecycle controller drives. The two commit operations
/// must be atomic with respect to every other method on the store: no reader
/// may observe a loan inserted for an unreserved copy, a reserved copy with
/// no open loan, a second open loan for one copy, or a member past the loan
/// limit — not even transiently.
pub trait CirculationStore: CopyLedger + LoanStore {
    /// Inserts the loan and reserves its copy as one unit, re-validating
    /// copy availability and the member's open-loan count inside the same
    /// critical section that writes. The loser of a racing borrow gets
    /// `CopyUnavailable`; a racing over-limit borrow gets
    /// `LoanLimitExceeded`.
    fn commit_borrow(&self, loan: LoanRecord, loan_limit: usize)
        -> Result<LoanRecord, CirculationError>;

    /// Closes the loan and releases its copy as one unit. Late returns are
    /// not an error; returning twice is (`AlreadyReturned`), and the second
    /// call leaves state untouched.
    fn commit_return(
        &self,
        id: &LoanId,
        returned_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<LoanRecord, CirculationError>;
}

/// Business-rule rejections produced by the circulation engine. Every
/// variant names the entity and invariant involved so callers can render an
/// actionable message; none of them are retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum CirculationError {
    #[error("copy not found: {0}")]
    CopyNotFound(CopyId),
    #[error("copy {0} is already on loan")]
    CopyUnavailable(CopyId),
    #[error("member {member} holds {held} open loans (limit {limit})")]
    LoanLimitExceeded {
        member: MemberId,
        held: usize,
        limit: usize,
    },
    #[error("member {0} is blocked from borrowing")]
    MemberBlocked(MemberId),
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),
    #[error("loan not found: {0}")]
    LoanNotFound(LoanId),
    #[error("loan {0} was already returned")]
    AlreadyReturned(LoanId),
    #[error("loan period must be at least one day, got {0}")]
    InvalidLoanPeriod(i64),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for CirculationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnknownCopy(id) => CirculationError::CopyNotFound(id),
            LedgerError::AlreadyBorrowed(id) => CirculationError::CopyUnavailable(id),
            LedgerError::NotBorrowed(id) => CirculationError::Store(StoreError::Unavailable(
                format!("copy {id} released while not borrowed"),
            )),
            LedgerError::Unavailable(reason) => {
                CirculationError::Store(StoreError::Unavailable(reason))
            }
        }
    }
}
