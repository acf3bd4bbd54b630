use super::domain::{CopyId, CopyRecord, CopyStatus};
use super::store::StoreError;

/// Errors raised by copy state transitions.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("copy {0} is not registered")]
    UnknownCopy(CopyId),
    #[error("copy {0} is already borrowed")]
    AlreadyBorrowed(CopyId),
    #[error("copy {0} is not currently borrowed")]
    NotBorrowed(CopyId),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative record of each copy's lending state.
///
/// `reserve` and `release` are the only operations that change a copy's
/// status, and implementations must make each one atomic: a caller never
/// reads a status and writes it back in two steps.
pub trait CopyLedger: Send + Sync {
    /// Adds a copy on behalf of the catalog collaborator. Rejects duplicate
    /// ids with `StoreError::Conflict`.
    fn register(&self, copy: CopyRecord) -> Result<CopyRecord, StoreError>;

    fn get(&self, id: &CopyId) -> Result<Option<CopyRecord>, StoreError>;

    fn status(&self, id: &CopyId) -> Result<Option<CopyStatus>, StoreError>;

    /// Flips `Available -> Borrowed`, failing with `AlreadyBorrowed` when the
    /// copy is out. The losing side of a race observes the failure, never a
    /// corrupted state.
    fn reserve(&self, id: &CopyId) -> Result<(), LedgerError>;

    /// Flips `Borrowed -> Available`, failing with `NotBorrowed` when the
    /// copy is already in.
    fn release(&self, id: &CopyId) -> Result<(), LedgerError>;
}
