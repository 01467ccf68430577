//! SOQL pagination and SOSL grouping tests

mod common;

use serde_json::json;

use common::*;
use sfmcp_core::backend::{HttpMethod, RetryPolicy};
use sfmcp_core::BridgeConfig;

const PAGE_2: &str = "/services/data/v59.0/query/01gD0000000001-200";
const PAGE_3: &str = "/services/data/v59.0/query/01gD0000000001-400";

fn three_page_org() -> std::sync::Arc<FakeOrg> {
    let org = FakeOrg::new();
    org.on(HttpMethod::Get, &format!("{DATA}/query?q="), vec![soql_page(0, 200, 447, Some(PAGE_2))]);
    org.on(HttpMethod::Get, PAGE_2, vec![soql_page(200, 200, 447, Some(PAGE_3))]);
    org.on(HttpMethod::Get, PAGE_3, vec![soql_page(400, 47, 447, None)]);
    org
}

#[tokio::test]
async fn test_soql_accumulates_all_pages_in_order() {
    let org = three_page_org();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id, Name FROM Account"}))
        .await;

    assert!(result.success, "{:?}", result.error);
    let payload = result.result.unwrap();
    let records = payload["records"].as_array().unwrap();

    assert_eq!(records.len(), 447);
    assert_eq!(payload["total_size"], 447);
    assert_eq!(payload["done"], true);
    assert_eq!(payload["truncated"], false);

    // Backend order is preserved
    assert_eq!(records[0]["Name"], "Account 0");
    assert_eq!(records[200]["Name"], "Account 200");
    assert_eq!(records[446]["Name"], "Account 446");

    // Pages fetched sequentially, one call each
    let paths: Vec<String> = org.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths.len(), 3);
    assert!(paths[0].starts_with(&format!("{DATA}/query?q=SELECT%20Id")));
    assert_eq!(paths[1], PAGE_2);
    assert_eq!(paths[2], PAGE_3);
}

#[tokio::test]
async fn test_soql_stops_at_max_records_param() {
    let org = three_page_org();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch(
            "run_soql_query",
            &json!({"query": "SELECT Id FROM Account", "max_records": "250"}),
        )
        .await;

    let payload = result.result.unwrap();
    assert_eq!(payload["records"].as_array().unwrap().len(), 250);
    assert_eq!(payload["truncated"], true);
    assert_eq!(payload["done"], false);
    assert_eq!(payload["total_size"], 447);

    // Third page never requested
    assert_eq!(org.call_count(), 2);
}

#[tokio::test]
async fn test_soql_config_cap_wins_over_larger_param() {
    let org = three_page_org();
    let auth = FakeAuth::new();
    let config = BridgeConfig::builder()
        .retry(RetryPolicy::immediate(3))
        .max_query_records(100)
        .build();
    let dispatcher = dispatcher_with(&org, &auth, config);

    let result = dispatcher
        .dispatch(
            "run_soql_query",
            &json!({"query": "SELECT Id FROM Account", "max_records": 5000}),
        )
        .await;

    let payload = result.result.unwrap();
    assert_eq!(payload["records"].as_array().unwrap().len(), 100);
    assert_eq!(payload["truncated"], true);
    assert_eq!(org.call_count(), 1);
}

#[tokio::test]
async fn test_soql_single_page() {
    let org = FakeOrg::new();
    org.on(HttpMethod::Get, &format!("{DATA}/query?q="), vec![soql_page(0, 3, 3, None)]);
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id FROM Account LIMIT 3"}))
        .await;

    let payload = result.result.unwrap();
    assert_eq!(payload["records"].as_array().unwrap().len(), 3);
    assert_eq!(payload["done"], true);
    assert_eq!(org.call_count(), 1);
}

#[tokio::test]
async fn test_soql_transient_page_is_retried() {
    let org = FakeOrg::new();
    org.on(HttpMethod::Get, &format!("{DATA}/query?q="), vec![soql_page(0, 200, 247, Some(PAGE_2))]);
    org.on(HttpMethod::Get, PAGE_2, vec![server_error(), soql_page(200, 47, 247, None)]);
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id FROM Account"}))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.result.unwrap()["records"].as_array().unwrap().len(), 247);
    assert_eq!(org.calls_to(PAGE_2), 2);
}

#[tokio::test]
async fn test_soql_malformed_query_passes_code_through() {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/query?q="),
        vec![sf_error(400, "MALFORMED_QUERY", "unexpected token: FORM")],
    );
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id FORM Account"}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, "QuerySyntaxError");
    assert_eq!(error.code, "MALFORMED_QUERY");
    assert!(error.message.contains("unexpected token: FORM"));
    assert!(!error.retryable);

    // Input errors are not retried
    assert_eq!(org.call_count(), 1);
}

#[tokio::test]
async fn test_soql_field_permission_denied() {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/query?q="),
        vec![sf_error(400, "INSUFFICIENT_ACCESS", "No access to field Salary__c")],
    );
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Salary__c FROM Contact"}))
        .await;

    assert_eq!(result.error_kind(), Some("PermissionError"));
}

#[tokio::test]
async fn test_soql_persistent_outage_exhausts_retries() {
    let org = FakeOrg::new();
    org.on(HttpMethod::Get, &format!("{DATA}/query?q="), vec![server_error()]);
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id FROM Account"}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, "TransientBackendError");
    assert!(error.retryable);
    assert_eq!(org.call_count(), 3);
}

#[tokio::test]
async fn test_soql_invalid_max_records() {
    let org = FakeOrg::new();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("run_soql_query", &json!({"query": "SELECT Id FROM Account", "max_records": 0}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, "ValidationError");
    assert_eq!(error.path.as_deref(), Some("max_records"));
    assert_eq!(org.call_count(), 0);
}

#[tokio::test]
async fn test_sosl_groups_by_object_type() {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/search?q="),
        vec![ok(json!({
            "searchRecords": [
                {"attributes": {"type": "Account"}, "Id": "001A", "Name": "Acme"},
                {"attributes": {"type": "Contact"}, "Id": "003A", "Name": "Ada Acme"},
                {"attributes": {"type": "Account"}, "Id": "001B", "Name": "Acme Labs"}
            ]
        }))],
    );
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch(
            "run_sosl_search",
            &json!({"search": "FIND {Acme} IN ALL FIELDS RETURNING Account(Id, Name), Contact(Id, Name)"}),
        )
        .await;

    assert!(result.success, "{:?}", result.error);
    let payload = result.result.unwrap();
    assert_eq!(payload["total"], 3);
    assert_eq!(payload["groups"][0]["object_type"], "Account");
    assert_eq!(payload["groups"][0]["records"].as_array().unwrap().len(), 2);
    assert_eq!(payload["groups"][1]["object_type"], "Contact");

    // Search text is encoded, not rewritten
    assert!(org.calls()[0].path.contains("FIND%20%7BAcme%7D"));
}

#[tokio::test]
async fn test_sosl_malformed_search() {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/search?q="),
        vec![sf_error(400, "MALFORMED_SEARCH", "No search term found")],
    );
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher.dispatch("run_sosl_search", &json!({"search": "FIND {}"})).await;

    assert_eq!(result.error_kind(), Some("QuerySyntaxError"));
    assert_eq!(result.error.unwrap().code, "MALFORMED_SEARCH");
}
