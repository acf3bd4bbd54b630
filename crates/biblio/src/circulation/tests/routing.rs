use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use super::common::*;
use crate::circulation::memory::InMemoryCirculation;
use crate::circulation::router::{self, BorrowRequest, ReturnRequest};
use crate::circulation::service::CirculationService;

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn borrow_request(copy: &str, member: &str) -> BorrowRequest {
    BorrowRequest {
        copy_id: copy.to_string(),
        member_id: member.to_string(),
        loan_period_days: None,
    }
}

#[tokio::test]
async fn borrow_handler_creates_a_loan() {
    let (service, _, _) = build_service();

    let response = router::borrow_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-001", "m-alice")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["copy_id"], "c-001");
    assert_eq!(body["member_id"], "m-alice");
    assert_eq!(body["standing"], "active");
    assert_eq!(body["fee"]["amount"], 0.0);
}

#[tokio::test]
async fn borrow_handler_maps_conflict_to_409() {
    let (service, _, _) = build_service();

    service
        .borrow(
            crate::circulation::CopyId("c-001".to_string()),
            crate::circulation::MemberId("m-alice".to_string()),
            None,
        )
        .expect("first borrow succeeds");

    let response = router::borrow_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-001", "m-bob")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn borrow_handler_maps_unknown_member_to_404() {
    let (service, _, _) = build_service();

    let response = router::borrow_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-001", "m-nobody")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn borrow_handler_maps_blocked_member_to_403() {
    let (service, _, roster) = build_service();
    roster.block("m-carol");

    let response = router::borrow_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-001", "m-carol")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn borrow_handler_maps_loan_limit_to_422() {
    let (service, _, _) = build_service();

    for copy in ["c-001", "c-002", "c-003"] {
        service
            .borrow(
                crate::circulation::CopyId(copy.to_string()),
                crate::circulation::MemberId("m-alice".to_string()),
                None,
            )
            .expect("borrow under the cap succeeds");
    }

    let response = router::borrow_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-004", "m-alice")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["kind"], "limit_exceeded");
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("limit"));
}

#[tokio::test]
async fn borrow_handler_maps_store_outage_to_503() {
    let roster = Arc::new(RosterDirectory::default());
    roster.enroll("m-alice");
    let service = Arc::new(CirculationService::new(
        Arc::new(UnavailableStore),
        roster,
        policy(),
    ));

    let response = router::borrow_handler::<UnavailableStore, RosterDirectory>(
        State(service),
        axum::Json(borrow_request("c-001", "m-alice")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn return_handler_closes_and_then_conflicts() {
    let (service, _, _) = build_service();

    let loan = service
        .borrow(
            crate::circulation::CopyId("c-001".to_string()),
            crate::circulation::MemberId("m-alice".to_string()),
            None,
        )
        .expect("borrow succeeds");

    let response = router::return_handler::<InMemoryCirculation, RosterDirectory>(
        State(service.clone()),
        Path(loan.id.0.clone()),
        axum::Json(ReturnRequest::default()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["standing"], "returned");

    let again = router::return_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        Path(loan.id.0),
        axum::Json(ReturnRequest::default()),
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn loan_handler_reports_unknown_loans_as_404() {
    let (service, _, _) = build_service();

    let response = router::loan_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        Path("loan-missing".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eligibility_handler_reports_every_reason() {
    let (service, _, roster) = build_service();
    roster.block("m-alice");

    service
        .borrow(
            crate::circulation::CopyId("c-001".to_string()),
            crate::circulation::MemberId("m-bob".to_string()),
            None,
        )
        .expect("borrow succeeds");

    let response = router::eligibility_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        Path(("c-001".to_string(), "m-alice".to_string())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["eligible"], false);
    let reasons = body["reasons"].as_array().expect("reasons array");
    assert_eq!(reasons.len(), 2);
    assert_eq!(reasons[0]["reason"], "copy_unavailable");
    assert_eq!(reasons[1]["reason"], "member_blocked");
}

#[tokio::test]
async fn member_risk_handler_serves_a_profile() {
    let (service, _, _) = build_service();

    let response = router::member_risk_handler::<InMemoryCirculation, RosterDirectory>(
        State(service),
        Path("m-alice".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["reliability_score"], 100);
    assert_eq!(body["risk_level"], "low");
}
