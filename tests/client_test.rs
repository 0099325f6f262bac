// Integration tests for the authenticated API client
//
// These run against a local mockito server and cover the refresh-and-retry
// contract: bearer attachment, single-flight refresh, one retry at most,
// and error passthrough.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;

use finboard_client::{ApiClient, Config, TokenStore};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const SUMMARY_BODY: &str = r#"{
    "success": true,
    "message": "ok",
    "data": {
        "totalBalance": {"amount": 100.0, "currency": "TRY"},
        "totalExpense": {"amount": 40.0, "currency": "TRY"},
        "totalSavings": {"amount": 10.0, "currency": "TRY"}
    }
}"#;

const USER_BODY: &str = r#"{
    "id": "u-1",
    "fullName": "Ada Lovelace",
    "email": "ada@example.com",
    "role": "user",
    "isActive": true
}"#;

fn test_config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        http_connect_timeout: 5,
        http_request_timeout: 10,
        token_cache_file: None,
        log_level: "info".to_string(),
    }
}

async fn client_with_token(
    server: &mockito::ServerGuard,
    token: Option<&str>,
) -> (ApiClient, Arc<TokenStore>) {
    let tokens = Arc::new(TokenStore::in_memory());
    if let Some(t) = token {
        tokens.set(t).await;
    }
    let client = ApiClient::new(&test_config(&server.url()), Arc::clone(&tokens))
        .expect("Failed to create API client");
    (client, tokens)
}

// ==================================================================================================
// Token attachment
// ==================================================================================================

#[tokio::test]
async fn test_bearer_header_attached_when_token_present() {
    let mut server = mockito::Server::new_async().await;

    let profile = server
        .mock("GET", "/users/profile")
        .match_header("authorization", "Bearer tok1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(USER_BODY)
        .expect(1)
        .create_async()
        .await;

    let (client, _tokens) = client_with_token(&server, Some("tok1")).await;

    let user = client.profile().await.expect("profile should succeed");
    assert_eq!(user.email, "ada@example.com");

    profile.assert_async().await;
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let mut server = mockito::Server::new_async().await;

    let summary = server
        .mock("GET", "/financial/summary")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SUMMARY_BODY)
        .expect(1)
        .create_async()
        .await;

    let (client, _tokens) = client_with_token(&server, None).await;

    let data = client.financial_summary().await.expect("summary should succeed");
    assert_eq!(data.total_balance.amount, 100.0);

    summary.assert_async().await;
}

// ==================================================================================================
// Non-auth passthrough
// ==================================================================================================

#[tokio::test]
async fn test_non_auth_errors_pass_through_without_refresh() {
    let mut server = mockito::Server::new_async().await;

    let failing = server
        .mock("GET", "/financial/summary")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "email is required"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/users/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, Some("tok1")).await;

    let err = client.financial_summary().await.unwrap_err();
    match err {
        finboard_client::ApiError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "email is required");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    // No refresh, no retry, no token mutation.
    assert_eq!(tokens.get().await, Some("tok1".to_string()));
    failing.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_network_failure_propagates_without_refresh() {
    // Bind a listener just long enough to claim a port, then drop it so
    // every connection attempt is refused. (Dropping a mockito server does
    // not close its listener, so it cannot be used to free a port.)
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind port");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let tokens = Arc::new(TokenStore::in_memory());
    tokens.set("tok1").await;
    let client = ApiClient::new(&test_config(&url), Arc::clone(&tokens))
        .expect("Failed to create API client");

    let err = client.financial_summary().await.unwrap_err();
    match err {
        finboard_client::ApiError::Network(e) => {
            assert!(e.is_connect() || e.is_request(), "unexpected error: {:?}", e);
        }
        other => panic!("expected Network error, got {:?}", other),
    }

    // The refresh cycle never ran: it would have either replaced or
    // cleared the stored token.
    assert_eq!(tokens.get().await, Some("tok1".to_string()));
}

// ==================================================================================================
// Refresh and retry
// ==================================================================================================

#[tokio::test]
async fn test_401_triggers_refresh_and_single_resend() {
    let mut server = mockito::Server::new_async().await;

    // The header matchers are disjoint: the initial request carries tok1,
    // the resend carries tok2.
    let stale = server
        .mock("GET", "/financial/summary")
        .match_header("authorization", "Bearer tok1")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Token expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/users/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "tok2"}"#)
        .expect(1)
        .create_async()
        .await;

    let fresh = server
        .mock("GET", "/financial/summary")
        .match_header("authorization", "Bearer tok2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SUMMARY_BODY)
        .expect(1)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, Some("tok1")).await;

    // The caller never observes the intermediate 401.
    let data = client.financial_summary().await.expect("summary should succeed after refresh");
    assert_eq!(data.total_balance.amount, 100.0);
    assert_eq!(tokens.get().await, Some("tok2".to_string()));

    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn test_retried_request_is_not_retried_again() {
    let mut server = mockito::Server::new_async().await;

    // 401 regardless of which token is attached: original + one retry only.
    let summary = server
        .mock("GET", "/financial/summary")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Token expired"}"#)
        .expect(2)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/users/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "tok2"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, _tokens) = client_with_token(&server, Some("tok1")).await;

    let err = client.financial_summary().await.unwrap_err();
    assert!(err.is_unauthorized(), "expected Unauthorized, got {:?}", err);

    summary.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_refresh_failure_clears_token_and_propagates_original_error() {
    let mut server = mockito::Server::new_async().await;

    let summary = server
        .mock("GET", "/financial/summary")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Token expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/users/refresh-token")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Session ended"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, Some("tok1")).await;

    let err = client.financial_summary().await.unwrap_err();
    match err {
        finboard_client::ApiError::Unauthorized { message } => {
            // The original request's failure, not the refresh endpoint's.
            assert_eq!(message, "Token expired");
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }

    assert_eq!(tokens.get().await, None);
    summary.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_refresh_response_without_token_counts_as_failure() {
    let mut server = mockito::Server::new_async().await;

    let summary = server
        .mock("GET", "/financial/summary")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Token expired"}"#)
        .expect(1)
        .create_async()
        .await;

    // 200 from the refresh endpoint, but no accessToken in the body.
    let refresh = server
        .mock("POST", "/users/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, Some("tok1")).await;

    let err = client.financial_summary().await.unwrap_err();
    match err {
        finboard_client::ApiError::Unauthorized { message } => {
            assert_eq!(message, "Token expired");
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }

    // A tokenless refresh ends the session just like a failed one.
    assert_eq!(tokens.get().await, None);
    summary.assert_async().await;
    refresh.assert_async().await;
}

// ==================================================================================================
// Single-refresh invariant
// ==================================================================================================

#[tokio::test]
async fn test_concurrent_401s_coalesce_into_one_refresh() {
    let mut server = mockito::Server::new_async().await;

    let stale = server
        .mock("GET", "/financial/summary")
        .match_header("authorization", "Bearer tok1")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Token expired"}"#)
        .expect(3)
        .create_async()
        .await;

    // The refresh response is held back long enough for every concurrent
    // failure to attach to the in-flight operation.
    let refresh = server
        .mock("POST", "/users/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(|writer| {
            std::thread::sleep(Duration::from_millis(300));
            writer.write_all(br#"{"accessToken": "tok2"}"#)
        })
        .expect(1)
        .create_async()
        .await;

    let fresh = server
        .mock("GET", "/financial/summary")
        .match_header("authorization", "Bearer tok2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SUMMARY_BODY)
        .expect(3)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, Some("tok1")).await;

    let (a, b, c) = tokio::join!(
        client.financial_summary(),
        client.financial_summary(),
        client.financial_summary(),
    );

    // All callers recovered via the same refreshed token.
    assert_eq!(a.expect("request A").total_balance.amount, 100.0);
    assert_eq!(b.expect("request B").total_balance.amount, 100.0);
    assert_eq!(c.expect("request C").total_balance.amount, 100.0);
    assert_eq!(tokens.get().await, Some("tok2".to_string()));

    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
}

// ==================================================================================================
// Session lifecycle
// ==================================================================================================

#[tokio::test]
async fn test_login_stores_token_and_logout_clears_it() {
    let mut server = mockito::Server::new_async().await;

    let login = server
        .mock("POST", "/users/login")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"success": true, "message": "ok", "data": {{"user": {}, "accessToken": "tok1"}}}}"#,
            USER_BODY
        ))
        .expect(1)
        .create_async()
        .await;

    let logout = server
        .mock("POST", "/users/logout")
        .match_header("authorization", "Bearer tok1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "message": "ok", "data": null}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, tokens) = client_with_token(&server, None).await;

    let session = client
        .login(&finboard_client::models::LoginRequest {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .expect("login should succeed");
    assert_eq!(session.user.full_name, "Ada Lovelace");
    assert_eq!(tokens.get().await, Some("tok1".to_string()));

    client.logout().await.expect("logout should succeed");
    assert_eq!(tokens.get().await, None);

    login.assert_async().await;
    logout.assert_async().await;
}

#[tokio::test]
async fn test_transaction_limit_is_sent_as_query() {
    let mut server = mockito::Server::new_async().await;

    let transactions = server
        .mock("GET", "/financial/transactions/recent")
        .match_query(Matcher::UrlEncoded("limit".to_string(), "5".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "message": "ok", "data": {"transactions": []}}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, _tokens) = client_with_token(&server, Some("tok1")).await;

    let list = client.recent_transactions(5).await.expect("transactions should succeed");
    assert!(list.is_empty());

    transactions.assert_async().await;
}
