//! MCP protocol tests
//!
//! The dispatcher runs against an in-memory org so the protocol layer is
//! exercised end to end without a network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use sfmcp_core::backend::{HttpMethod, HttpRequest, HttpResponse, OrgTransport, RetryPolicy};
use sfmcp_core::session::{Authenticator, SessionGrant, SessionManager};
use sfmcp_core::{BackendClient, BridgeConfig, BridgeError, BridgeResult, Credentials, Dispatcher};
use sfmcp_mcp::{McpError, McpResponse, McpServer, PROTOCOL_VERSION};

/// Answers every describe with a one-field `Account`
#[derive(Default)]
struct DescribeOrg {
    calls: AtomicUsize,
}

#[async_trait]
impl OrgTransport for DescribeOrg {
    fn name(&self) -> &str {
        "describe-org"
    }

    async fn send(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.method == HttpMethod::Get && request.path().ends_with("/describe") {
            return Ok(HttpResponse::json(
                200,
                json!({
                    "name": "Account",
                    "label": "Account",
                    "labelPlural": "Accounts",
                    "custom": false,
                    "fields": [{"name": "Id", "label": "Account ID", "type": "id", "nillable": false}]
                }),
            ));
        }
        Ok(HttpResponse::json(404, json!([{"errorCode": "NOT_FOUND", "message": "no such resource"}])))
    }
}

struct StaticAuth;

#[async_trait]
impl Authenticator for StaticAuth {
    async fn login(&self, _credentials: &Credentials) -> BridgeResult<SessionGrant> {
        Ok(SessionGrant {
            access_token: "token-1".to_string(),
            instance_url: "https://acme.my.salesforce.com".to_string(),
            valid_for_seconds: Some(7_200),
        })
    }
}

fn server() -> (McpServer, Arc<DescribeOrg>) {
    let org = Arc::new(DescribeOrg::default());
    let config = BridgeConfig::builder().retry(RetryPolicy::immediate(1)).build();
    let sessions = Arc::new(SessionManager::new(
        Arc::new(StaticAuth),
        Credentials::new("admin@acme.example", "s3cret", ""),
    ));
    let backend = BackendClient::new(Arc::clone(&org) as Arc<dyn OrgTransport>, sessions, &config);
    (McpServer::new(Dispatcher::new(backend, config)), org)
}

async fn call(server: &McpServer, message: Value) -> McpResponse {
    server
        .handle_line(&message.to_string())
        .await
        .expect("request should get a response")
}

/// Parse the envelope out of a tools/call result
fn envelope(response: &McpResponse) -> Value {
    let text = response.result.as_ref().unwrap()["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_initialize() {
    let (server, _org) = server();

    let response = call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;

    let result = response.result.unwrap();
    assert_eq!(response.id, json!(1));
    assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(result["serverInfo"]["name"], "salesforce-mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_initialized_notification_has_no_response() {
    let (server, _org) = server();

    let response = server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    assert!(response.is_none());
}

#[tokio::test]
async fn test_ping() {
    let (server, _org) = server();

    let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;

    assert_eq!(response.result, Some(json!({})));
}

#[tokio::test]
async fn test_unknown_method() {
    let (server, _org) = server();

    let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"})).await;

    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let (server, _org) = server();

    let response = server.handle_line("{not json").await.unwrap();

    assert_eq!(response.id, Value::Null);
    assert_eq!(response.error.unwrap().code, -32700);
}

#[tokio::test]
async fn test_wrong_jsonrpc_version() {
    let (server, _org) = server();

    let response = call(&server, json!({"jsonrpc": "1.0", "id": 3, "method": "ping"})).await;

    assert_eq!(response.id, json!(3));
    assert_eq!(response.error.unwrap().code, -32600);
}

#[tokio::test]
async fn test_tools_list() {
    let (server, _org) = server();

    let response = call(&server, json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"})).await;

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 7);
    for tool in &tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn test_tools_call_without_name() {
    let (server, org) = server();

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"arguments": {}}}),
    )
    .await;

    assert_eq!(response.error.unwrap().code, -32602);
    assert_eq!(org.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tool_failure_is_a_result_not_an_rpc_error() {
    let (server, org) = server();

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
               "params": {"name": "delete_everything", "arguments": {}}}),
    )
    .await;

    assert!(!response.is_error());
    assert_eq!(response.result.as_ref().unwrap()["isError"], true);
    assert_eq!(envelope(&response)["error"]["kind"], "UnknownTool");
    assert_eq!(org.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tool_success() {
    let (server, _org) = server();

    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
               "params": {"name": "get_object_fields", "arguments": {"object_name": "Account"}}}),
    )
    .await;

    assert_eq!(response.result.as_ref().unwrap()["isError"], false);
    let envelope = envelope(&response);
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["result"]["fields"][0]["name"], "Id");
}

#[tokio::test]
async fn test_serve_answers_every_request_once() {
    let (server, _org) = server();
    let (client, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);

    let handle = tokio::spawn(server.serve(server_read, server_write));

    let (client_read, mut client_write) = tokio::io::split(client);
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "describe_object", "arguments": {"object_name": "Account"}}}),
    ];
    for message in &input {
        client_write.write_all(format!("{message}\n").as_bytes()).await.unwrap();
    }
    client_write.shutdown().await.unwrap();

    let mut lines = BufReader::new(client_read).lines();
    let mut ids = HashSet::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        let response: McpResponse = serde_json::from_str(&line).unwrap();
        assert!(response.error.is_none(), "{line}");
        ids.insert(response.id.as_i64().unwrap());
    }

    // Responses may arrive in any order, notifications get none
    assert_eq!(ids, HashSet::from([1, 2, 3]));
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_long_session_answers_while_input_stays_open() {
    let (server, org) = server();
    let (client, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);

    let handle = tokio::spawn(server.serve(server_read, server_write));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    // Each answer arrives before the next request is sent
    for id in 0..200 {
        let method = if id % 2 == 0 { "ping" } else { "tools/list" };
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method});
        client_write.write_all(format!("{message}\n").as_bytes()).await.unwrap();

        let line = lines.next_line().await.unwrap().unwrap();
        let response: McpResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(response.id, json!(id));
        assert!(response.error.is_none(), "{line}");
    }
    assert!(!handle.is_finished());

    client_write.shutdown().await.unwrap();
    assert!(lines.next_line().await.unwrap().is_none());
    handle.await.unwrap().unwrap();
    assert_eq!(org.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_bridge_error_codes() {
    let err = McpError::from(BridgeError::validation("query", "required parameter is missing"));
    assert_eq!(err.error_code(), -32602);

    let err = McpError::from(BridgeError::authentication("INVALID_LOGIN"));
    assert_eq!(err.error_code(), -32001);

    assert_eq!(McpError::MethodNotFound("x".into()).error_code(), -32601);
}
