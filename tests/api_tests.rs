use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chatju::openai::fake::FakeOpenAIClient;
use chatju::test_utils::init_test_logging;
use chatju::AppState;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Create a test app backed by the sample catalog and fake collaborators
fn app_with_openai(openai: FakeOpenAIClient) -> (Arc<AppState>, Router) {
    let app_state = Arc::new(AppState::new_for_testing_with_openai_client(
        Some(Arc::new(openai)),
    ));
    let routes = chatju::app::routes(app_state.clone());
    (app_state, routes)
}

fn app() -> (Arc<AppState>, Router) {
    let app_state = Arc::new(AppState::new_for_testing());
    let routes = chatju::app::routes(app_state.clone());
    (app_state, routes)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    init_test_logging();
    let (_, router) = app();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_not_found() {
    init_test_logging();
    let (_, router) = app();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_page_renders() {
    init_test_logging();
    let (_, router) = app();

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("청주 문화 챗봇"));
    assert!(html.contains("보내기"));
}

#[tokio::test]
async fn test_chat_api_round_trip_and_history() {
    init_test_logging();
    let (app_state, router) = app_with_openai(
        FakeOpenAIClient::new().with_response("청남대의 아름다운 이야기"),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"message": "청남대"}).to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();
    let reply = body["reply"].as_str().unwrap();

    // Weather block, generated description, and café info in one reply.
    assert!(reply.contains("맑음"));
    assert!(reply.contains("청남대의 아름다운 이야기"));
    assert!(reply.contains("카페A"));

    // Both sides of the exchange are in the session history.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/history/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    let messages = history.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "청남대");
    assert_eq!(messages[1]["role"], "assistant");

    assert_eq!(app_state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_chat_api_reuses_supplied_session() {
    init_test_logging();
    let (app_state, router) = app_with_openai(
        FakeOpenAIClient::new().with_responses(vec!["첫 답변", "둘째 답변"]),
    );

    let first = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"message": "청남대"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let session_id = body_json(first).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let second = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"session_id": session_id, "message": "상당산성"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(second).await;
    assert_eq!(body["session_id"], session_id.as_str());

    let history = app_state.sessions.history(&session_id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(app_state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_chat_form_redirects_to_session_page() {
    init_test_logging();
    let (_, router) =
        app_with_openai(FakeOpenAIClient::new().with_response("답변"));

    let form_body: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("message", "청남대")
        .finish();
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from(form_body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("/?session="));
}

#[tokio::test]
async fn test_sites_api() {
    init_test_logging();
    let (_, router) = app();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/sites")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body, json!(["청남대", "상당산성"]));
}

#[tokio::test]
async fn test_cafes_api_groups_and_filters_reviews() {
    init_test_logging();
    let (_, router) = app();

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("place", "청남대")
        .finish();
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/cafes?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["place"], "청남대");
    let cafes = body["cafes"].as_array().unwrap();
    assert_eq!(cafes.len(), 2);
    assert_eq!(cafes[0]["cafe_name"], "카페A");
    assert_eq!(cafes[0]["reviews"], json!(["맛있어요"]));
    // 카페B only had the placeholder review, which is filtered out.
    assert_eq!(cafes[1]["cafe_name"], "카페B");
    assert_eq!(cafes[1]["reviews"], json!([]));
}

#[tokio::test]
async fn test_cafes_api_unknown_place_is_empty_not_error() {
    init_test_logging();
    let (_, router) = app();

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("place", "청주")
        .finish();
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/cafes?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cafes"], json!([]));
}

#[tokio::test]
async fn test_status_counts_processed_requests() {
    init_test_logging();
    let (_, router) =
        app_with_openai(FakeOpenAIClient::new().with_response("답변"));

    let chat = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"message": "청남대"}).to_string()))
        .unwrap();
    router.clone().oneshot(chat).await.unwrap();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["catalog_rows"], 3);
    assert_eq!(body["active_sessions"], 1);
    assert_eq!(body["openai_model"], "gpt-3.5-turbo");
    assert_eq!(body["stats"]["processed_count"], 1);
    assert_eq!(body["stats"]["error_count"], 0);
}
