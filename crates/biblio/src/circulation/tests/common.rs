use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::circulation::domain::{CopyId, CopyRecord, LoanId, LoanRecord, MemberId};
use crate::circulation::fees::{CirculationPolicy, GracePeriodPolicy, LoanPolicy};
use crate::circulation::ledger::{CopyLedger, LedgerError};
use crate::circulation::members::{DirectoryError, MemberDirectory};
use crate::circulation::memory::InMemoryCirculation;
use crate::circulation::service::CirculationService;
use crate::circulation::store::{
    CirculationError, CirculationStore, LoanStore, StoreError,
};

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn grace() -> GracePeriodPolicy {
    GracePeriodPolicy {
        grace_period_days: 3,
        base_late_fee: 1.0,
        daily_late_fee: 0.5,
        max_late_fee: 25.0,
        notification_offsets: vec![1, 3, 7, 14],
        auto_suspend_days: 30,
    }
}

pub(super) fn policy() -> CirculationPolicy {
    CirculationPolicy {
        loan: LoanPolicy {
            loan_period_days: 14,
            max_active_loans: 3,
        },
        grace: grace(),
    }
}

pub(super) fn copy(id: &str, book: &str, number: u32) -> CopyRecord {
    CopyRecord::new(CopyId(id.to_string()), book, number)
}

/// Loan record due at `due_at`, borrowed the standard period earlier.
pub(super) fn open_loan(id: &str, copy_id: &str, member_id: &str, due_at: DateTime<Utc>) -> LoanRecord {
    LoanRecord {
        id: LoanId(id.to_string()),
        copy_id: CopyId(copy_id.to_string()),
        member_id: MemberId(member_id.to_string()),
        borrowed_at: due_at - Duration::days(14),
        due_at,
        returned_at: None,
        notes: None,
    }
}

pub(super) fn returned_loan(
    id: &str,
    copy_id: &str,
    member_id: &str,
    due_at: DateTime<Utc>,
    returned_at: DateTime<Utc>,
) -> LoanRecord {
    LoanRecord {
        returned_at: Some(returned_at),
        ..open_loan(id, copy_id, member_id, due_at)
    }
}

/// Backfills a loan the way a migration would: the row plus the matching
/// ledger reservation when the loan is still open.
pub(super) fn seed_loan(store: &InMemoryCirculation, loan: LoanRecord) {
    let reserve = loan.is_open();
    let copy_id = loan.copy_id.clone();
    store.insert(loan).expect("seed loan");
    if reserve {
        store.reserve(&copy_id).expect("seed reservation");
    }
}

/// Member roster stub with an explicit blocked set.
#[derive(Default, Clone)]
pub(super) struct RosterDirectory {
    members: Arc<Mutex<HashMap<MemberId, bool>>>,
}

impl RosterDirectory {
    pub(super) fn enroll(&self, id: &str) {
        self.members
            .lock()
            .expect("roster mutex poisoned")
            .insert(MemberId(id.to_string()), false);
    }

    pub(super) fn block(&self, id: &str) {
        self.members
            .lock()
            .expect("roster mutex poisoned")
            .insert(MemberId(id.to_string()), true);
    }
}

impl MemberDirectory for RosterDirectory {
    fn member_exists(&self, id: &MemberId) -> Result<bool, DirectoryError> {
        Ok(self
            .members
            .lock()
            .expect("roster mutex poisoned")
            .contains_key(id))
    }

    fn is_blocked(&self, id: &MemberId) -> Result<bool, DirectoryError> {
        Ok(self
            .members
            .lock()
            .expect("roster mutex poisoned")
            .get(id)
            .copied()
            .unwrap_or(false))
    }
}

/// Store stub that is always down, for exercising the `Unavailable` path.
pub(super) struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("store offline".to_string())
}

impl CopyLedger for UnavailableStore {
    fn register(&self, _copy: CopyRecord) -> Result<CopyRecord, StoreError> {
        Err(down())
    }

    fn get(&self, _id: &CopyId) -> Result<Option<CopyRecord>, StoreError> {
        Err(down())
    }

    fn status(&self, _id: &CopyId) -> Result<Option<crate::circulation::CopyStatus>, StoreError> {
        Err(down())
    }

    fn reserve(&self, _id: &CopyId) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("store offline".to_string()))
    }

    fn release(&self, _id: &CopyId) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("store offline".to_string()))
    }
}

impl LoanStore for UnavailableStore {
    fn insert(&self, _loan: LoanRecord) -> Result<LoanRecord, StoreError> {
        Err(down())
    }

    fn update(&self, _loan: LoanRecord) -> Result<(), StoreError> {
        Err(down())
    }

    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanRecord>, StoreError> {
        Err(down())
    }

    fn open_loan_for_copy(&self, _copy_id: &CopyId) -> Result<Option<LoanRecord>, StoreError> {
        Err(down())
    }

    fn open_loans_for_member(&self, _member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError> {
        Err(down())
    }

    fn history_for_member(&self, _member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError> {
        Err(down())
    }

    fn open_loans(&self) -> Result<Vec<LoanRecord>, StoreError> {
        Err(down())
    }
}

impl CirculationStore for UnavailableStore {
    fn commit_borrow(
        &self,
        _loan: LoanRecord,
        _loan_limit: usize,
    ) -> Result<LoanRecord, CirculationError> {
        Err(CirculationError::Store(down()))
    }

    fn commit_return(
        &self,
        _id: &LoanId,
        _returned_at: DateTime<Utc>,
        _notes: Option<String>,
    ) -> Result<LoanRecord, CirculationError> {
        Err(CirculationError::Store(down()))
    }
}

/// Service over a freshly seeded store: copies c-001..c-004 of two titles,
/// members m-alice, m-bob, m-carol enrolled and unblocked.
pub(super) fn build_service() -> (
    Arc<CirculationService<InMemoryCirculation, RosterDirectory>>,
    Arc<InMemoryCirculation>,
    Arc<RosterDirectory>,
) {
    let store = Arc::new(InMemoryCirculation::new());
    for (id, book, number) in [
        ("c-001", "bk-moby-dick", 1),
        ("c-002", "bk-moby-dick", 2),
        ("c-003", "bk-middlemarch", 1),
        ("c-004", "bk-middlemarch", 2),
    ] {
        store.register(copy(id, book, number)).expect("seed copy");
    }

    let roster = Arc::new(RosterDirectory::default());
    roster.enroll("m-alice");
    roster.enroll("m-bob");
    roster.enroll("m-carol");

    let service = Arc::new(CirculationService::new(
        store.clone(),
        roster.clone(),
        policy(),
    ));
    (service, store, roster)
}
