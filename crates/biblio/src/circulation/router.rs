use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CopyId, LoanId, MemberId};
use super::members::MemberDirectory;
use super::store::{CirculationError, CirculationStore, StoreError};
use super::service::CirculationService;

/// Router builder exposing the circulation endpoints.
pub fn circulation_router<S, M>(service: Arc<CirculationService<S, M>>) -> Router
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    Router::new()
        .route("/api/v1/circulation/loans", post(borrow_handler::<S, M>))
        .route(
            "/api/v1/circulation/loans/:loan_id",
            get(loan_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/loans/:loan_id/return",
            post(return_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/members/:member_id/loans",
            get(member_loans_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/members/:member_id/risk",
            get(member_risk_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/copies/:copy_id/loan",
            get(copy_loan_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/copies/:copy_id/eligibility/:member_id",
            get(eligibility_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/overdue",
            get(overdue_handler::<S, M>),
        )
        .route(
            "/api/v1/circulation/notices",
            get(notices_handler::<S, M>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub copy_id: String,
    pub member_id: String,
    #[serde(default)]
    pub loan_period_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// HTTP status for a rejection, per the error taxonomy: absent entities are
/// 404, state conflicts 409, policy/limit refusals 422, blocked members 403,
/// infrastructure trouble 503.
pub fn status_for(error: &CirculationError) -> StatusCode {
    match error {
        CirculationError::CopyNotFound(_)
        | CirculationError::LoanNotFound(_)
        | CirculationError::MemberNotFound(_) => StatusCode::NOT_FOUND,
        CirculationError::CopyUnavailable(_) | CirculationError::AlreadyReturned(_) => {
            StatusCode::CONFLICT
        }
        CirculationError::LoanLimitExceeded { .. } | CirculationError::InvalidLoanPeriod(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CirculationError::MemberBlocked(_) => StatusCode::FORBIDDEN,
        CirculationError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
        CirculationError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CirculationError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        CirculationError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
    }
}

/// Taxonomy bucket for a rejection, so clients can branch without parsing
/// the message text.
fn kind_label(error: &CirculationError) -> &'static str {
    match error {
        CirculationError::CopyNotFound(_)
        | CirculationError::LoanNotFound(_)
        | CirculationError::MemberNotFound(_) => "not_found",
        CirculationError::CopyUnavailable(_) | CirculationError::AlreadyReturned(_) => "conflict",
        CirculationError::LoanLimitExceeded { .. } => "limit_exceeded",
        CirculationError::MemberBlocked(_) => "policy_violation",
        CirculationError::InvalidLoanPeriod(_) => "invalid_input",
        CirculationError::Directory(_) => "unavailable",
        CirculationError::Store(StoreError::Unavailable(_)) => "unavailable",
        CirculationError::Store(StoreError::Conflict) => "conflict",
        CirculationError::Store(StoreError::NotFound) => "not_found",
    }
}

fn rejection_response(error: CirculationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": kind_label(&error),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}

pub(crate) async fn borrow_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    axum::Json(request): axum::Json<BorrowRequest>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let copy_id = CopyId(request.copy_id);
    let member_id = MemberId(request.member_id);

    match service.borrow(copy_id, member_id, request.loan_period_days) {
        Ok(loan) => match service.loan_view(&loan.id, None) {
            Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
            Err(error) => rejection_response(error),
        },
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn return_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path(loan_id): Path<String>,
    axum::Json(request): axum::Json<ReturnRequest>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let id = LoanId(loan_id);
    match service.return_loan(&id, request.notes) {
        Ok(loan) => match service.loan_view(&loan.id, None) {
            Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
            Err(error) => rejection_response(error),
        },
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn loan_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let id = LoanId(loan_id);
    match service.loan_view(&id, None) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn member_loans_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path(member_id): Path<String>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let id = MemberId(member_id);
    match service.active_loans_for_member(&id) {
        Ok(loans) => {
            let views: Vec<_> = loans
                .iter()
                .filter_map(|loan| service.loan_view(&loan.id, None).ok())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn member_risk_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path(member_id): Path<String>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let id = MemberId(member_id);
    match service.risk_profile(&id, None) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn copy_loan_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path(copy_id): Path<String>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let id = CopyId(copy_id);
    match service.active_loan_for_copy(&id) {
        Ok(Some(loan)) => match service.loan_view(&loan.id, None) {
            Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
            Err(error) => rejection_response(error),
        },
        Ok(None) => (StatusCode::OK, axum::Json(serde_json::Value::Null)).into_response(),
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn eligibility_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
    Path((copy_id, member_id)): Path<(String, String)>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    let copy_id = CopyId(copy_id);
    let member_id = MemberId(member_id);
    match service.eligibility(&copy_id, &member_id) {
        Ok(report) => {
            let payload = json!({
                "eligible": report.is_eligible(),
                "reasons": report.reasons,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn overdue_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    match service.list_overdue(None, None) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => rejection_response(error),
    }
}

pub(crate) async fn notices_handler<S, M>(
    State(service): State<Arc<CirculationService<S, M>>>,
) -> Response
where
    S: CirculationStore + 'static,
    M: MemberDirectory + 'static,
{
    match service.notices_due(None) {
        Ok(notices) => (StatusCode::OK, axum::Json(notices)).into_response(),
        Err(error) => rejection_response(error),
    }
}
