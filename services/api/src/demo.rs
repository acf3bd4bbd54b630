use crate::infra::{default_policy, parse_date, seed_branch, StaticMemberDirectory};
use biblio::circulation::{
    CirculationError, CirculationService, CopyId, CopyLedger, InMemoryCirculation, LoanId,
    LoanRecord, LoanStore, MemberId,
};
use biblio::error::AppError;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct OverdueArgs {
    /// Reference date for the sweep (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the reporting half of the demo (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Skip the live borrow/return walkthrough
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

type DemoService = CirculationService<InMemoryCirculation, StaticMemberDirectory>;

/// Seeds a branch with a few weeks of borrowing history so the overdue and
/// risk surfaces have something to say.
fn seeded_circulation(
    as_of: DateTime<Utc>,
) -> Result<(Arc<DemoService>, Arc<InMemoryCirculation>), CirculationError> {
    let store = Arc::new(InMemoryCirculation::new());
    let directory = Arc::new(StaticMemberDirectory::default());
    seed_branch(&store, &directory);
    directory.block("m-dana");

    let history = [
        // (loan, copy, member, due offset from as_of, returned offset)
        ("loan-h01", "c-001", "m-bob", -10, None),
        ("loan-h02", "c-003", "m-bob", -3, None),
        ("loan-h03", "c-005", "m-carol", -35, None),
        ("loan-h04", "c-002", "m-carol", -20, Some(-12)),
        ("loan-h05", "c-004", "m-alice", -40, Some(-41)),
    ];

    for (id, copy, member, due_offset, returned_offset) in history {
        let due_at = as_of + Duration::days(due_offset);
        let loan = LoanRecord {
            id: LoanId(id.to_string()),
            copy_id: CopyId(copy.to_string()),
            member_id: MemberId(member.to_string()),
            borrowed_at: due_at - Duration::days(14),
            due_at,
            returned_at: returned_offset.map(|offset| as_of + Duration::days(offset)),
            notes: None,
        };
        let open = loan.is_open();
        let copy_id = loan.copy_id.clone();
        store.insert(loan)?;
        if open {
            store.reserve(&copy_id)?;
        }
    }

    let service = Arc::new(CirculationService::new(
        store.clone(),
        directory,
        default_policy(),
    ));
    Ok((service, store))
}

pub(crate) fn run_overdue_report(args: OverdueArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let (service, _) = seeded_circulation(as_of)?;

    render_overdue_report(&service, as_of)?;
    Ok(())
}

fn render_overdue_report(service: &DemoService, as_of: DateTime<Utc>) -> Result<(), AppError> {
    let overdue = service.list_overdue(Some(as_of), None)?;
    println!("Overdue loans as of {}", as_of.date_naive());
    if overdue.is_empty() {
        println!("- none");
    }
    for entry in &overdue {
        println!(
            "- {} | copy {} | member {} | {} day(s) overdue | fee {:.2}{}",
            entry.loan_id,
            entry.copy_id,
            entry.member_id,
            entry.days_overdue,
            entry.accrued_fee,
            if entry.within_grace { " (in grace)" } else { "" }
        );
    }

    let notices = service.notices_due(Some(as_of))?;
    println!("\nNotices due today");
    if notices.is_empty() {
        println!("- none");
    }
    for notice in &notices {
        println!(
            "- {} to member {} ({} day(s) past due, offset {})",
            notice.loan_id, notice.member_id, notice.days_overdue, notice.offset
        );
    }

    let candidates = service.suspension_candidates(Some(as_of))?;
    println!("\nSuspension candidates");
    if candidates.is_empty() {
        println!("- none");
    }
    for candidate in &candidates {
        println!(
            "- member {} | worst loan {} | {} day(s) overdue",
            candidate.member_id, candidate.loan_id, candidate.days_overdue
        );
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let (service, _store) = seeded_circulation(as_of)?;

    println!("Biblio circulation demo");
    render_overdue_report(&service, as_of)?;

    println!("\nMember risk profiles");
    for member in ["m-alice", "m-bob", "m-carol"] {
        let profile = service.risk_profile(&MemberId(member.to_string()), Some(as_of))?;
        println!(
            "- {} | reliability {} | repeat-offender {} | {} | {:.0}% overdue rate",
            member,
            profile.reliability_score,
            profile.repeat_offender_score,
            profile.risk_level.label(),
            profile.overdue_rate
        );
    }

    if args.skip_lifecycle {
        return Ok(());
    }

    println!("\nLive lifecycle walkthrough");
    let loan = service.borrow(
        CopyId("c-006".to_string()),
        MemberId("m-alice".to_string()),
        None,
    )?;
    println!(
        "- m-alice borrowed copy c-006 (loan {}, due {})",
        loan.id,
        loan.due_at.date_naive()
    );

    match service.borrow(
        CopyId("c-006".to_string()),
        MemberId("m-bob".to_string()),
        None,
    ) {
        Err(CirculationError::CopyUnavailable(_)) => {
            println!("- m-bob was turned away: the copy is already out");
        }
        Ok(_) => println!("- unexpected: double-booked copy c-006"),
        Err(other) => println!("- unexpected rejection: {other}"),
    }

    let returned = service.return_loan(&loan.id, Some("returned at the front desk".to_string()))?;
    println!(
        "- m-alice returned it on {}",
        returned
            .returned_at
            .map(|ts| ts.date_naive().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );

    service.borrow(
        CopyId("c-006".to_string()),
        MemberId("m-bob".to_string()),
        None,
    )?;
    println!("- m-bob borrowed the freed copy");

    Ok(())
}
