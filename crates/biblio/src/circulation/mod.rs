//! Borrowing lifecycle, overdue assessment, and member risk scoring.
//!
//! Catalog and member CRUD live elsewhere; this module owns the one part of
//! the system with real state-transition semantics. The copy ledger and the
//! loan store sit behind traits so the service can be exercised against the
//! in-memory store in tests and swapped for a durable one without touching
//! the lifecycle logic.

pub mod domain;
pub(crate) mod eligibility;
pub mod fees;
pub mod ledger;
pub mod members;
pub mod memory;
pub mod report;
pub(crate) mod risk;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{CopyId, CopyRecord, CopyStatus, LoanId, LoanRecord, LoanStanding, MemberId};
pub use eligibility::{EligibilityGuard, EligibilityReport, IneligibilityReason};
pub use fees::{CirculationPolicy, FeeAssessment, GracePeriodPolicy, LoanPolicy};
pub use ledger::{CopyLedger, LedgerError};
pub use members::{DirectoryError, MemberDirectory};
pub use memory::InMemoryCirculation;
pub use report::{LoanNotice, LoanView, OverdueEntry, SuspensionCandidate};
pub use risk::{RiskLevel, RiskProfile, RiskScorer};
pub use router::circulation_router;
pub use service::CirculationService;
pub use store::{CirculationError, CirculationStore, LoanStore, StoreError};
