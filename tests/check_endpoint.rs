// tests/check_endpoint.rs
mod common;

use actix_web::{http::StatusCode, test, App};
use common::{data_url, StubEmbedder, TestContext, STUB_MODEL};
use facecheck::{
    api::types::CheckResponse,
    core::identity::{Descriptor, EnrolledIdentity, SubjectId, FACE_MISMATCH_FLAG},
    embedding::ProviderStatus,
    storage::IdentityStore,
};
use serde_json::{json, Value};

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLACK: [u8; 3] = [0, 0, 0];

async fn enroll_red(ctx: &TestContext, subject: &str) {
    let identity = EnrolledIdentity::new(
        SubjectId::new(subject),
        Descriptor::new(vec![1.0, 0.0, 0.0]),
        Some(STUB_MODEL.to_string()),
    );
    ctx.store.save_identity(&identity).await.unwrap();
}

async fn post_check(ctx: &TestContext, body: Value) -> CheckResponse {
    let state = ctx.state.clone();
    let app = test::init_service(App::new().configure(move |cfg| state.configure(cfg))).await;
    let req = test::TestRequest::post().uri("/check").set_json(body).to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn test_matching_face_is_ok() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-1", "image": data_url(RED) }),
    )
    .await;

    assert_eq!(response.status, "ok");
    assert_eq!(response.distance, Some(0.0));
    assert!(response.message.is_none());

    let records = ctx.store.audit_records(&SubjectId::new("alice")).await.unwrap();
    assert!(records.is_empty());
}

#[actix_web::test]
async fn test_mismatch_writes_one_audit_record() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-2", "image": data_url(GREEN) }),
    )
    .await;

    assert_eq!(response.status, "mismatch");
    let distance = response.distance.unwrap();
    assert!((distance - 2f64.sqrt()).abs() < 1e-6);

    let records = ctx.store.audit_records(&SubjectId::new("alice")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].challenge_id.as_str(), "c-2");
    assert!(records[0].has_flag(FACE_MISMATCH_FLAG));
}

#[actix_web::test]
async fn test_frame_without_face_is_noface() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-3", "image": data_url(BLACK) }),
    )
    .await;

    assert_eq!(response.status, "noface");
    assert!(response.distance.is_none());
    let records = ctx.store.audit_records(&SubjectId::new("alice")).await.unwrap();
    assert!(records.is_empty());
}

#[actix_web::test]
async fn test_missing_image_is_reported() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    let response = post_check(&ctx, json!({ "userId": "alice", "challengeId": "c-4" })).await;

    assert_eq!(response.status, "error");
    assert_eq!(response.message.as_deref(), Some("No image received"));
}

#[actix_web::test]
async fn test_models_not_loaded_wins_over_bad_payload() {
    let ctx = TestContext::with_embedder(StubEmbedder::with_status(ProviderStatus::Loading));
    enroll_red(&ctx, "alice").await;

    let response = post_check(&ctx, json!({ "userId": "alice", "challengeId": "c-5" })).await;
    assert_eq!(response.status, "error");
    assert_eq!(response.message.as_deref(), Some("models not loaded"));

    ctx.embedder.set_status(ProviderStatus::Ready);
    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-5", "image": data_url(RED) }),
    )
    .await;
    assert_eq!(response.status, "ok");
}

#[actix_web::test]
async fn test_unknown_subject_is_an_error() {
    let ctx = TestContext::new();

    let response = post_check(
        &ctx,
        json!({ "userId": "mallory", "challengeId": "c-6", "image": data_url(RED) }),
    )
    .await;

    assert_eq!(response.status, "error");
    assert_eq!(
        response.message.as_deref(),
        Some("identity has no enrolled descriptor")
    );
    let records = ctx.store.audit_records(&SubjectId::new("mallory")).await.unwrap();
    assert!(records.is_empty());
}

#[actix_web::test]
async fn test_undecodable_image_is_an_error() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-7", "image": "data:image/png;base64,aGVsbG8=" }),
    )
    .await;

    assert_eq!(response.status, "error");
    assert!(response.message.unwrap().starts_with("Image could not be decoded"));
}

#[actix_web::test]
async fn test_malformed_body_still_answers_200() {
    let ctx = TestContext::new();
    let state = ctx.state.clone();
    let app = test::init_service(App::new().configure(move |cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/check")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let response: CheckResponse = test::read_body_json(resp).await;
    assert_eq!(response.status, "error");
    assert_eq!(response.message.as_deref(), Some("invalid request body"));
}

#[actix_web::test]
async fn test_oversized_body_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.state.max_request_size = 64;

    let response = post_check(
        &ctx,
        json!({ "userId": "alice", "challengeId": "c-8", "image": data_url(RED) }),
    )
    .await;

    assert_eq!(response.status, "error");
    assert_eq!(response.message.as_deref(), Some("request body too large"));
}

#[actix_web::test]
async fn test_checks_are_counted_in_health() {
    let ctx = TestContext::new();
    enroll_red(&ctx, "alice").await;

    post_check(&ctx, json!({ "userId": "alice", "challengeId": "a", "image": data_url(RED) })).await;
    post_check(&ctx, json!({ "userId": "alice", "challengeId": "b", "image": data_url(GREEN) })).await;
    post_check(&ctx, json!({ "userId": "alice", "challengeId": "c", "image": data_url(BLACK) })).await;

    let report = ctx.state.health.report();
    assert_eq!(report.metrics.checks.total, 3);
    assert_eq!(report.metrics.checks.ok, 1);
    assert_eq!(report.metrics.checks.mismatch, 1);
    assert_eq!(report.metrics.checks.noface, 1);
    assert!(report.metrics.last_mismatch_at.is_some());
}
