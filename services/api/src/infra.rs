use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use biblio::circulation::{
    CirculationPolicy, CopyId, CopyLedger, CopyRecord, DirectoryError, GracePeriodPolicy,
    InMemoryCirculation, LoanPolicy, MemberDirectory, MemberId,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Member roster stub standing in for the externally owned member service.
/// Real deployments point the service at that system's directory instead.
#[derive(Default, Clone)]
pub(crate) struct StaticMemberDirectory {
    members: Arc<Mutex<HashMap<MemberId, bool>>>,
}

impl StaticMemberDirectory {
    pub(crate) fn enroll(&self, id: &str) {
        self.members
            .lock()
            .expect("roster mutex poisoned")
            .insert(MemberId(id.to_string()), false);
    }

    pub(crate) fn block(&self, id: &str) {
        self.members
            .lock()
            .expect("roster mutex poisoned")
            .insert(MemberId(id.to_string()), true);
    }
}

impl MemberDirectory for StaticMemberDirectory {
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

pub(crate) fn default_policy() -> CirculationPolicy {
    CirculationPolicy {
        loan: LoanPolicy {
            loan_period_days: 14,
            max_active_loans: 3,
        },
        grace: GracePeriodPolicy {
            grace_period_days: 3,
            base_late_fee: 1.0,
            daily_late_fee: 0.5,
            max_late_fee: 25.0,
            notification_offsets: vec![1, 3, 7, 14],
            auto_suspend_days: 30,
        },
    }
}

/// Seeds a small branch worth of copies and members so the service has
/// something to lend out of the box.
pub(crate) fn seed_branch(store: &InMemoryCirculation, directory: &StaticMemberDirectory) {
    let catalog = [
        ("c-001", "bk-moby-dick", 1),
        ("c-002", "bk-moby-dick", 2),
        ("c-003", "bk-middlemarch", 1),
        ("c-004", "bk-middlemarch", 2),
        ("c-005", "bk-piranesi", 1),
        ("c-006", "bk-piranesi", 2),
    ];
    for (id, book, number) in catalog {
        // Re-seeding an existing store is a no-op per copy.
        let _ = store.register(CopyRecord::new(CopyId(id.to_string()), book, number));
    }

    for member in ["m-alice", "m-bob", "m-carol", "m-dana"] {
        directory.enroll(member);
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
