//! HTTP API tests: router wired to fake providers and an in-memory
//! database, exercised with one-shot tower calls.

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use helpers::{
    match_count, memory_pool, test_state, FixedImage, FixedText, ReportBuilder,
    VanishingCandidateText,
};
use refind_common::db::models::ReportType;
use refind_match::build_router;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_module_identity() {
    let pool = memory_pool().await;
    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "refind-match");
}

#[tokio::test]
async fn trigger_unknown_report_is_404() {
    let pool = memory_pool().await;
    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .oneshot(post(&format!("/matching/trigger/{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn trigger_returns_ranked_matches_with_counters() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    ReportBuilder::new(ReportType::Found)
        .occurred_days_ago(2)
        .insert(&pool)
        .await;

    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.85))),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["candidates_considered"], 1);
    assert_eq!(json["matches_upserted"], 1);
    assert_eq!(json["pairs_skipped"], 0);
    assert!(json["matches"][0]["score_total"].as_f64().unwrap() >= 0.65);
    assert!(json.get("warning").is_none());
}

#[tokio::test]
async fn partially_failed_trigger_reports_warning() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Found).insert(&pool).await;
    ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    let doomed = ReportBuilder::new(ReportType::Lost).insert(&pool).await;

    // One candidate vanishes mid-pass; its pair is skipped, the rest
    // of the batch persists
    let text = VanishingCandidateText {
        pool: pool.clone(),
        victims: vec![doomed.id],
        score: 0.95,
    };
    let app = build_router(test_state(
        pool.clone(),
        Arc::new(text),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["candidates_considered"], 2);
    assert_eq!(json["matches_upserted"], 1);
    assert_eq!(json["pairs_skipped"], 1);
    assert!(json["warning"].as_str().unwrap().contains("1 of 2"));
    assert_eq!(match_count(&pool).await, 1);
}

#[tokio::test]
async fn fully_failed_trigger_is_500_and_recorded() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    let doomed = ReportBuilder::new(ReportType::Found).insert(&pool).await;

    let text = VanishingCandidateText {
        pool: pool.clone(),
        victims: vec![doomed.id],
        score: 0.95,
    };
    let app = build_router(test_state(
        pool.clone(),
        Arc::new(text),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .clone()
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(match_count(&pool).await, 0);

    // The failure surfaces on the health endpoint
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["last_error"]
        .as_str()
        .unwrap()
        .contains("candidate pairs failed"));
}

#[tokio::test]
async fn trigger_all_rejects_unknown_type_filter() {
    let pool = memory_pool().await;
    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .oneshot(post_json(
            "/matching/trigger-all",
            r#"{"report_type": "stolen"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trigger_all_without_body_sweeps_both_types() {
    let pool = memory_pool().await;
    ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    ReportBuilder::new(ReportType::Found)
        .occurred_days_ago(1)
        .insert(&pool)
        .await;

    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    ));

    let response = app.oneshot(post("/matching/trigger-all")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["reports_processed"], 2);
    assert_eq!(json["matches_upserted"], 2);
}

#[tokio::test]
async fn status_and_clear_round_trip() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    ReportBuilder::new(ReportType::Found)
        .occurred_days_ago(1)
        .insert(&pool)
        .await;

    let state = test_state(
        pool.clone(),
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    );
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/matching/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["matches_total"], 1);
    assert_eq!(json["matches_candidate"], 1);

    let response = app.clone().oneshot(post("/matching/clear")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["deleted"], 1);
    assert_eq!(match_count(&pool).await, 0);
}

#[tokio::test]
async fn persisted_matches_are_listable_per_report() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    ReportBuilder::new(ReportType::Found)
        .occurred_days_ago(1)
        .insert(&pool)
        .await;

    let app = build_router(test_state(
        pool,
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    ));

    let response = app
        .clone()
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/matching/matches/{}", source.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    // Unknown report is a 404, not an empty list
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/matching/matches/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn match_status_transition_via_api() {
    let pool = memory_pool().await;
    let source = ReportBuilder::new(ReportType::Lost).insert(&pool).await;
    ReportBuilder::new(ReportType::Found)
        .occurred_days_ago(1)
        .insert(&pool)
        .await;

    let state = test_state(
        pool.clone(),
        Arc::new(FixedText(Some(0.9))),
        Arc::new(FixedImage(None)),
    );
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(post(&format!("/matching/trigger/{}", source.id)))
        .await
        .unwrap();
    let json = body_json(response).await;
    let match_id = json["matches"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/matching/matches/{}/status", match_id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status": "promoted"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "promoted");

    // Unknown transition target is a 400
    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/matching/matches/{}/status", match_id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status": "archived"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
