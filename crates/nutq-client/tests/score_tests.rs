use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::put};
use nutq_attempt::{PersistenceGateway, ScoreSubmission, error::PersistenceError};
use nutq_client::HttpScoreGateway;
use serde_json::{Value, json};

use crate::common::spawn_backend;

fn submission(category: Option<&str>) -> ScoreSubmission {
    ScoreSubmission {
        word_id: "9b2f6d0e-word".to_string(),
        category_id: category.map(String::from),
        score: 86,
    }
}

#[tokio::test]
async fn test_save_score_returns_summary() {
    let router = Router::new().route(
        "/api/visitor-scores",
        put(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["cookie"], "session=learner-session");
            assert_eq!(body["word_uuid"], "9b2f6d0e-word");
            assert_eq!(body["score"], 86);
            assert_eq!(body["category_slug"], "animals");
            Json(json!({
                "ok": true,
                "overall": 72.5,
                "scores": { "9b2f6d0e-word": 86, "other-word": 59 }
            }))
        }),
    );
    let config = spawn_backend(router)
        .await
        .with_session_token("learner-session");
    let gateway = HttpScoreGateway::new(&config).unwrap();

    let summary = gateway.save_score(submission(Some("animals"))).await.unwrap();
    assert_eq!(summary.overall, Some(73));
    assert_eq!(summary.per_word.get("9b2f6d0e-word"), Some(&86));
    assert_eq!(summary.per_word.get("other-word"), Some(&59));
}

#[tokio::test]
async fn test_save_score_without_category() {
    let router = Router::new().route(
        "/api/visitor-scores",
        put(|Json(body): Json<Value>| async move {
            assert!(body.get("category_slug").is_none());
            Json(json!({ "ok": true }))
        }),
    );
    let config = spawn_backend(router).await;
    let gateway = HttpScoreGateway::new(&config).unwrap();

    let summary = gateway.save_score(submission(None)).await.unwrap();
    assert_eq!(summary.overall, None);
    assert!(summary.per_word.is_empty());
}

#[tokio::test]
async fn test_unauthorized_is_rejected() {
    let router = Router::new().route(
        "/api/visitor-scores",
        put(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "message": "Unauthorized" })),
            )
        }),
    );
    let config = spawn_backend(router).await;
    let gateway = HttpScoreGateway::new(&config).unwrap();

    let err = gateway.save_score(submission(Some("animals"))).await.unwrap_err();
    match err {
        PersistenceError::Rejected(message) => assert_eq!(message, "Unauthorized"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let router = Router::new().route(
        "/api/visitor-scores",
        put(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "message": "Server error" })),
            )
        }),
    );
    let config = spawn_backend(router).await;
    let gateway = HttpScoreGateway::new(&config).unwrap();

    let err = gateway.save_score(submission(None)).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Transport(_)));
}

#[tokio::test]
async fn test_non_json_error_body() {
    let router = Router::new().route(
        "/api/visitor-scores",
        put(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let config = spawn_backend(router).await;
    let gateway = HttpScoreGateway::new(&config).unwrap();

    let err = gateway.save_score(submission(None)).await.unwrap_err();
    assert!(err.to_string().contains("502"));
}
