//! Integration tests for the API client using wiremock mock server

use notekeep_core::auth::{CredentialStore, MemoryStore, SessionManager};
use notekeep_core::models::UserPayload;
use notekeep_core::{ApiClient, ApiError};

use reqwest::Method;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn signed_in_session() -> SessionManager {
    let manager = SessionManager::new(CredentialStore::new(MemoryStore::new()));
    manager.restore();
    manager
        .sign_in(
            "tok1",
            UserPayload {
                id: Some(7),
                name: Some("A".to_string()),
                email: Some("a@x.com".to_string()),
            },
        )
        .unwrap();
    manager
}

#[tokio::test]
async fn test_get_unwraps_data_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notes"))
        .and(header("authorization", "Bearer tok1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "title": "X"}]
        })))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&format!("{}/api", mock_server.uri()), session.subscribe()).unwrap();

    let result = client.request("notes", Method::GET, None).await.unwrap();
    assert_eq!(result, json!([{"id": 1, "title": "X"}]));
}

#[tokio::test]
async fn test_raw_body_returned_as_is() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Work", "color": "#ff0000", "is_system": true, "user_id": null}
        ])))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let result = client.get("categories").await.unwrap();
    assert_eq!(result[0]["name"], "Work");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"description": "Buy milk", "subtasks": []})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": 9, "description": "Buy milk", "is_completed": false}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let body = json!({"description": "Buy milk", "subtasks": []});
    let result = client.request("tasks", Method::POST, Some(&body)).await.unwrap();
    assert_eq!(result["id"], 9);
}

#[tokio::test]
async fn test_delete_ignores_body_and_accepts_empty_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/notes/3"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let ignored = json!({"unused": true});
    let result = client
        .request("notes/3", Method::DELETE, Some(&ignored))
        .await
        .unwrap();
    assert!(result.is_null());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_signed_out_still_sends_bearer_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthenticated."
        })))
        .mount(&mock_server)
        .await;

    let session = SessionManager::new(CredentialStore::new(MemoryStore::new()));
    session.restore();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let err = client.get("notes").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Unauthenticated.");
}

#[tokio::test]
async fn test_token_change_is_picked_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    session
        .sign_in(
            "tok2",
            UserPayload {
                id: Some(8),
                name: None,
                email: Some("b@x.com".to_string()),
            },
        )
        .unwrap();

    assert_eq!(client.get("notes").await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let err = client.get("notes").await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { .. }));
}

#[tokio::test]
async fn test_server_error_is_rejected_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/notes/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let session = signed_in_session();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let err = client
        .request("notes/1", Method::PUT, Some(&json!({"title": "Y"})))
        .await
        .unwrap_err();
    match err {
        ApiError::Rejected { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 1
    let session = signed_in_session();
    let client = ApiClient::new("http://127.0.0.1:1", session.subscribe()).unwrap();

    let err = client.get("notes").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn test_login_posts_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"email": "a@x.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok9",
            "user": {"id": 7, "name": "A", "email": "a@x.com"}
        })))
        .mount(&mock_server)
        .await;

    let session = SessionManager::new(CredentialStore::new(MemoryStore::new()));
    session.restore();
    let client = ApiClient::new(&mock_server.uri(), session.subscribe()).unwrap();

    let payload = client.login("a@x.com", "secret").await.unwrap();
    assert_eq!(payload.access_token.as_deref(), Some("tok9"));

    let user = session
        .sign_in(&payload.access_token.unwrap_or_default(), payload.user.unwrap_or_default())
        .unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(session.token().as_deref(), Some("tok9"));
}
