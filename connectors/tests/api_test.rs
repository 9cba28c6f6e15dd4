// Integration tests for the connector HTTP API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use hub_connectors::api::{create_router, ApiState};
use hub_connectors::providers::calendar::config::CalendarConfig;
use hub_connectors::providers::github::config::GitHubConfig;
use hub_connectors::providers::{CalendarConnector, GitHubConnector};
use hub_connectors::{ConnectorRegistry, ConnectorRuntime, Provider};
use integration_hub::fetch::RecordingSleeper;
use integration_hub::oauth::StateManager;
use integration_hub::Url;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CALLBACK_BASE: &str = "http://hub.test";

/// Both connectors pointed at one mock server, for OAuth and API calls.
fn create_test_app(server: &ServerGuard) -> (Router, StateManager) {
    let mut github_oauth = GitHubConfig {
        client_id: "gh-client".to_string(),
        client_secret: "gh-secret".to_string(),
        redirect_uri: None,
    }
    .oauth_config();
    github_oauth.token_url = format!("{}/login/oauth/access_token", server.url());

    let mut calendar_oauth = CalendarConfig {
        client_id: "cal-client".to_string(),
        client_secret: "cal-secret".to_string(),
        redirect_uri: None,
    }
    .oauth_config();
    calendar_oauth.token_url = format!("{}/token", server.url());
    calendar_oauth.revoke_url = Some(format!("{}/revoke", server.url()));

    let sleeper = Arc::new(RecordingSleeper::new());
    let mut registry = ConnectorRegistry::new();
    registry.register(
        Provider::Github,
        Arc::new(GitHubConnector::with_runtime(
            ConnectorRuntime::new(github_oauth, server.url()).with_sleeper(sleeper.clone()),
        )),
    );
    registry.register(
        Provider::GoogleCalendar,
        Arc::new(CalendarConnector::with_runtime(
            ConnectorRuntime::new(calendar_oauth, server.url()).with_sleeper(sleeper),
        )),
    );

    let state_manager = StateManager::new(600);
    let router = create_router(ApiState {
        registry: Arc::new(registry),
        state_manager: state_manager.clone(),
        callback_base_url: CALLBACK_BASE.to_string(),
    });
    (router, state_manager)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_of(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location_query(response: &axum::response::Response) -> Vec<(String, String)> {
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

fn query_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

#[tokio::test]
async fn test_list_connectors() {
    let server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let response = app.oneshot(get("/api/connectors")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_of(response).await;
    let connectors = json.as_array().unwrap();
    assert_eq!(connectors.len(), 2);
    assert_eq!(connectors[0]["id"], "github");
    assert_eq!(connectors[0]["category"], "developer_tools");
    assert_eq!(connectors[0]["widgets"].as_array().unwrap().len(), 3);
    assert_eq!(connectors[1]["id"], "google-calendar");
    assert_eq!(connectors[1]["widgets"][0]["id"], "upcoming-events");
    assert_eq!(connectors[1]["widgets"][0]["refresh_interval"], 300);
}

#[tokio::test]
async fn test_unknown_connector_is_404() {
    let server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let response = app
        .oneshot(get("/api/connectors/slack/oauth/start"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_of(response).await;
    assert_eq!(json["kind"], "unknown_connector");
}

#[tokio::test]
async fn test_oauth_start_redirects_with_state() {
    let server = Server::new_async().await;
    let (app, state_manager) = create_test_app(&server);

    let response = app
        .oneshot(get("/api/connectors/github/oauth/start?account=acme"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let pairs = location_query(&response);
    assert_eq!(query_value(&pairs, "client_id").as_deref(), Some("gh-client"));
    assert_eq!(
        query_value(&pairs, "redirect_uri").as_deref(),
        Some("http://hub.test/api/connectors/github/oauth/callback")
    );
    assert!(query_value(&pairs, "code_challenge").is_none());

    let csrf_state = query_value(&pairs, "state").unwrap();
    assert_eq!(state_manager.count(), 1);
    let entry = state_manager.validate_and_consume(&csrf_state).unwrap();
    assert_eq!(entry.connector, "github");
    assert_eq!(entry.account, "acme");
    assert!(entry.code_verifier.is_none());
}

#[tokio::test]
async fn test_oauth_flow_with_pkce() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let response = app
        .clone()
        .oneshot(get("/api/connectors/google-calendar/oauth/start"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let pairs = location_query(&response);
    assert_eq!(query_value(&pairs, "access_type").as_deref(), Some("offline"));
    assert_eq!(
        query_value(&pairs, "code_challenge_method").as_deref(),
        Some("S256")
    );
    assert!(query_value(&pairs, "code_challenge").is_some());
    let csrf_state = query_value(&pairs, "state").unwrap();

    let token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "auth-code".into()),
            Matcher::UrlEncoded(
                "redirect_uri".into(),
                "http://hub.test/api/connectors/google-calendar/oauth/callback".into(),
            ),
            Matcher::Regex("code_verifier=".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"ya29.token","refresh_token":"1//refresh","expires_in":3599,"token_type":"Bearer","scope":"https://www.googleapis.com/auth/calendar.readonly"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let uri = format!(
        "/api/connectors/google-calendar/oauth/callback?code=auth-code&state={}",
        csrf_state
    );
    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    token_mock.assert_async().await;

    let json = json_of(response).await;
    assert_eq!(json["connector"], "google-calendar");
    assert_eq!(json["account"], "default");
    assert_eq!(json["tokens"]["access_token"], "ya29.token");
    assert_eq!(json["tokens"]["refresh_token"], "1//refresh");
    assert!(json["tokens"]["expires_at"].is_string());

    // State is single-use
    let response = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_rejections() {
    let server = Server::new_async().await;
    let (app, state_manager) = create_test_app(&server);

    let response = app
        .clone()
        .oneshot(get(
            "/api/connectors/github/oauth/callback?error=access_denied&error_description=User+denied",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_of(response).await;
    assert!(json["error"].as_str().unwrap().contains("access_denied"));

    let response = app
        .clone()
        .oneshot(get("/api/connectors/github/oauth/callback?code=c&state=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/connectors/github/oauth/callback?state=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // State issued for another connector
    let csrf_state = state_manager.create_state("google-calendar", "acme", None);
    let uri = format!(
        "/api/connectors/github/oauth/callback?code=c&state={}",
        csrf_state
    );
    let response = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state_manager.count(), 0);
}

#[tokio::test]
async fn test_callback_exchange_failure_is_bad_gateway() {
    let mut server = Server::new_async().await;
    let (app, state_manager) = create_test_app(&server);

    let _token_mock = server
        .mock("POST", "/login/oauth/access_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#)
        .create_async()
        .await;

    let csrf_state = state_manager.create_state("github", "acme", None);
    let uri = format!(
        "/api/connectors/github/oauth/callback?code=stale&state={}",
        csrf_state
    );
    let response = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_of(response).await;
    assert_eq!(json["kind"], "oauth");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("bad_verification_code"));
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let _token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.new","expires_in":3599}"#)
        .create_async()
        .await;

    let response = app
        .oneshot(post_json(
            "/api/connectors/google-calendar/oauth/refresh",
            json!({"refresh_token": "1//refresh"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_of(response).await;
    assert_eq!(json["access_token"], "ya29.new");
    assert_eq!(json["refresh_token"], "1//refresh");
}

#[tokio::test]
async fn test_revoke() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let revoke_mock = server
        .mock("POST", "/revoke")
        .match_body(Matcher::UrlEncoded("token".into(), "ya29.token".into()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/connectors/google-calendar/oauth/revoke",
            json!({"access_token": "ya29.token"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    revoke_mock.assert_async().await;

    // GitHub has no revoke endpoint: no-op
    let response = app
        .oneshot(post_json(
            "/api/connectors/github/oauth/revoke",
            json!({"access_token": "gho_token"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_connection_check() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let _user = server
        .mock("GET", "/user")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login": "alice", "id": 1}"#)
        .create_async()
        .await;

    let response = app
        .oneshot(post_json(
            "/api/connectors/github/test",
            json!({"tokens": {"access_token": "gho_token"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await["connected"], true);
}

#[tokio::test]
async fn test_widget_data() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let _notifications = server
        .mock("GET", "/notifications?per_page=30")
        .match_header("authorization", "Bearer gho_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{
                "id": "n1",
                "reason": "mention",
                "unread": true,
                "updated_at": "2026-02-18T00:00:00Z",
                "subject": {"title": "Check this", "type": "Issue", "url": null}
            }]"#,
        )
        .create_async()
        .await;

    let response = app
        .oneshot(post_json(
            "/api/connectors/github/widgets/notifications",
            json!({"tokens": {"access_token": "gho_token", "token_type": "bearer"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_of(response).await;
    assert_eq!(json["widgetId"], "notifications");
    assert_eq!(json["data"]["unread"], 1);
    assert!(json["fetchedAt"].is_string());
    assert!(json["expiresAt"].is_string());
}

#[tokio::test]
async fn test_widget_errors() {
    let mut server = Server::new_async().await;
    let (app, _) = create_test_app(&server);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/connectors/github/widgets/pull-requests",
            json!({"tokens": {"access_token": "gho_token"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_of(response).await["kind"], "unknown_widget");

    let _expired = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error": {"code": 401}}"#)
        .expect(1)
        .create_async()
        .await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/connectors/google-calendar/widgets/upcoming-events",
            json!({"tokens": {"access_token": "stale", "refresh_token": "1//refresh"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(response).await["kind"], "token_expired");

    // 429 on every attempt: default budget of 3 retries, then surfaced
    let limited = server
        .mock("GET", "/user/repos")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("Retry-After", "7")
        .expect(4)
        .create_async()
        .await;

    let response = app
        .oneshot(post_json(
            "/api/connectors/github/widgets/repositories",
            json!({"tokens": {"access_token": "gho_token"}, "params": {"per_page": 10}}),
        ))
        .await
        .unwrap();
    limited.assert_async().await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    assert_eq!(json_of(response).await["kind"], "rate_limited");
}
