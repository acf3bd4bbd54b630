use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{CopyId, CopyRecord, CopyStatus, LoanId, LoanRecord, MemberId};
use super::ledger::{CopyLedger, LedgerError};
use super::store::{CirculationError, CirculationStore, LoanStore, StoreError};

#[derive(Default)]
struct Inner {
    copies: HashMap<CopyId, CopyRecord>,
    loans: HashMap<LoanId, LoanRecord>,
}

/// Single-process circulation store. Copies and loans live behind one mutex,
/// so the compound commits are read-modify-write under a single lock and no
/// reader can observe the ledger and the loan history disagreeing.
#[derive(Default, Clone)]
pub struct InMemoryCirculation {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryCirculation {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("circulation mutex poisoned")
    }
}

/// Copy status only ever changes through these two helpers; the public
/// reserve/release and the compound commits all funnel into them.
fn reserve_locked(inner: &mut Inner, id: &CopyId) -> Result<(), LedgerError> {
    let copy = inner
        .copies
        .get_mut(id)
        .ok_or_else(|| LedgerError::UnknownCopy(id.clone()))?;
    match copy.status {
        CopyStatus::Borrowed => Err(LedgerError::AlreadyBorrowed(id.clone())),
        CopyStatus::Available => {
            copy.status = CopyStatus::Borrowed;
            Ok(())
        }
    }
}

fn release_locked(inner: &mut Inner, id: &CopyId) -> Result<(), LedgerError> {
    let copy = inner
        .copies
        .get_mut(id)
        .ok_or_else(|| LedgerError::UnknownCopy(id.clone()))?;
    match copy.status {
        CopyStatus::Available => Err(LedgerError::NotBorrowed(id.clone())),
        CopyStatus::Borrowed => {
            copy.status = CopyStatus::Available;
            Ok(())
        }
    }
}

fn open_loan_for_copy_locked(inner: &Inner, copy_id: &CopyId) -> Option<LoanRecord> {
    inner
        .loans
        .values()
        .find(|loan| loan.is_open() && &loan.copy_id == copy_id)
        .cloned()
}

fn open_count_for_member_locked(inner: &Inner, member_id: &MemberId) -> usize {
    inner
        .loans
        .values()
        .filter(|loan| loan.is_open() && &loan.member_id == member_id)
        .count()
}

fn sorted(mut loans: Vec<LoanRecord>) -> Vec<LoanRecord> {
    loans.sort_by(|a, b| a.borrowed_at.cmp(&b.borrowed_at).then(a.id.cmp(&b.id)));
    loans
}

impl CopyLedger for InMemoryCirculation {
    fn register(&self, copy: CopyRecord) -> Result<CopyRecord, StoreError> {
        let mut inner = self.lock();
        if inner.copies.contains_key(&copy.id) {
            return Err(StoreError::Conflict);
        }
        inner.copies.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    fn get(&self, id: &CopyId) -> Result<Option<CopyRecord>, StoreError> {
        Ok(self.lock().copies.get(id).cloned())
    }

    fn status(&self, id: &CopyId) -> Result<Option<CopyStatus>, StoreError> {
        Ok(self.lock().copies.get(id).map(|copy| copy.status))
    }

    fn reserve(&self, id: &CopyId) -> Result<(), LedgerError> {
        reserve_locked(&mut self.lock(), id)
    }

    fn release(&self, id: &CopyId) -> Result<(), LedgerError> {
        release_locked(&mut self.lock(), id)
    }
}

impl LoanStore for InMemoryCirculation {
    fn insert(&self, loan: LoanRecord) -> Result<LoanRecord, StoreError> {
        let mut inner = self.lock();
        if inner.loans.contains_key(&loan.id) {
            return Err(StoreError::Conflict);
        }
        inner.loans.insert(loan.id.clone(), loan.clone());
        Ok(loan)
    }

    fn update(&self, loan: LoanRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.loans.contains_key(&loan.id) {
            inner.loans.insert(loan.id.clone(), loan);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, StoreError> {
        Ok(self.lock().loans.get(id).cloned())
    }

    fn open_loan_for_copy(&self, copy_id: &CopyId) -> Result<Option<LoanRecord>, StoreError> {
        Ok(open_loan_for_copy_locked(&self.lock(), copy_id))
    }

    fn open_loans_for_member(&self, member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError> {
        let inner = self.lock();
        Ok(sorted(
            inner
                .loans
                .values()
                .filter(|loan| loan.is_open() && &loan.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    fn history_for_member(&self, member_id: &MemberId) -> Result<Vec<LoanRecord>, StoreError> {
        let inner = self.lock();
        Ok(sorted(
            inner
                .loans
                .values()
                .filter(|loan| &loan.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    fn open_loans(&self) -> Result<Vec<LoanRecord>, StoreError> {
        let inner = self.lock();
        Ok(sorted(
            inner
                .loans
                .values()
                .filter(|loan| loan.is_open())
                .cloned()
                .collect(),
        ))
    }
}

impl CirculationStore for InMemoryCirculation {
    fn commit_borrow(
        &self,
        loan: LoanRecord,
        loan_limit: usize,
    ) -> Result<LoanRecord, CirculationError> {
        let mut inner = self.lock();

        let status = inner
            .copies
            .get(&loan.copy_id)
            .map(|copy| copy.status)
            .ok_or_else(|| CirculationError::CopyNotFound(loan.copy_id.clone()))?;
        if status == CopyStatus::Borrowed || open_loan_for_copy_locked(&inner, &loan.copy_id).is_some()
        {
            return Err(CirculationError::CopyUnavailable(loan.copy_id.clone()));
        }

        let held = open_count_for_member_locked(&inner, &loan.member_id);
        if held >= loan_limit {
            return Err(CirculationError::LoanLimitExceeded {
                member: loan.member_id.clone(),
                held,
                limit: loan_limit,
            });
        }

        if inner.loans.contains_key(&loan.id) {
            return Err(CirculationError::Store(StoreError::Conflict));
        }

        reserve_locked(&mut inner, &loan.copy_id)?;
        inner.loans.insert(loan.id.clone(), loan.clone());
        Ok(loan)
    }

    fn commit_return(
        &self,
        id: &LoanId,
        returned_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<LoanRecord, CirculationError> {
        let mut inner = self.lock();

        let updated = {
            let loan = inner
                .loans
                .get_mut(id)
                .ok_or_else(|| CirculationError::LoanNotFound(id.clone()))?;
            if loan.returned_at.is_some() {
                return Err(CirculationError::AlreadyReturned(id.clone()));
            }
            loan.returned_at = Some(returned_at);
            if let Some(note) = notes {
                loan.notes = match loan.notes.take() {
                    Some(existing) => Some(format!("{existing}\n{note}")),
                    None => Some(note),
                };
            }
            loan.clone()
        };

        release_locked(&mut inner, &updated.copy_id)?;
        Ok(updated)
    }
}
