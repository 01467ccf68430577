//! Schema introspection tests

mod common;

use serde_json::{json, Value};

use common::*;
use sfmcp_core::backend::HttpMethod;

fn contact_fields() -> Value {
    json!([
        {"name": "Id", "label": "Contact ID", "type": "id", "length": 18, "nillable": false,
         "unique": false, "externalId": false, "createable": false, "updateable": false},
        {"name": "LastName", "label": "Last Name", "type": "string", "length": 80, "nillable": false,
         "createable": true, "updateable": true},
        {"name": "AccountId", "label": "Account ID", "type": "reference", "nillable": true,
         "referenceTo": ["Account"], "relationshipName": "Account", "createable": true, "updateable": true},
        {"name": "LeadSource", "label": "Lead Source", "type": "picklist", "nillable": true,
         "picklistValues": [
             {"value": "Web", "label": "Web", "defaultValue": false, "active": true},
             {"value": "Phone Inquiry", "label": "Phone Inquiry", "defaultValue": false, "active": true}
         ]},
        {"name": "Badge_Id__c", "label": "Badge Id", "type": "string", "length": 20, "nillable": true,
         "unique": true, "externalId": true}
    ])
}

fn contact_org() -> std::sync::Arc<FakeOrg> {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/sobjects/Contact/describe"),
        vec![describe("Contact", contact_fields())],
    );
    org
}

#[tokio::test]
async fn test_get_object_fields_shape() {
    let org = contact_org();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("get_object_fields", &json!({"object_name": "Contact"}))
        .await;

    assert!(result.success, "{:?}", result.error);
    let payload = result.result.unwrap();

    assert_eq!(payload["object_name"], "Contact");
    assert_eq!(payload["object_info"]["label"], "Contact");
    assert_eq!(payload["object_info"]["custom"], false);

    let fields = payload["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 5);

    // Org order is kept
    assert_eq!(fields[0]["name"], "Id");
    assert_eq!(fields[1]["required"], true);
    assert_eq!(fields[1]["length"], 80);

    assert_eq!(fields[2]["reference_to"], json!(["Account"]));
    assert_eq!(fields[2]["relationship_name"], "Account");
    assert!(fields[2].get("picklist_values").is_none());

    assert_eq!(fields[3]["picklist_values"][1]["value"], "Phone Inquiry");
    assert_eq!(fields[4]["external_id"], true);
    assert_eq!(fields[4]["unique"], true);
}

#[tokio::test]
async fn test_describe_object_with_details() {
    let org = contact_org();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("describe_object", &json!({"object_name": "Contact"}))
        .await;

    let payload = result.result.unwrap();
    assert_eq!(payload["object"]["name"], "Contact");
    assert_eq!(payload["object"]["key_prefix"], "a01");
    assert_eq!(payload["fields"][1]["type"], "string");
    assert_eq!(payload["fields"][1]["required"], true);

    let summary = payload["summary"].as_str().unwrap();
    assert!(summary.starts_with("## Contact (Contact)"));
    assert!(summary.contains("**Type:** Standard Object"));
    assert!(summary.contains("| LastName | Last Name | string | Yes | No | No |"));
    assert!(summary.contains("| AccountId | Account | Account |"));
    assert!(summary.contains("### Lead Source (LeadSource)"));
}

#[tokio::test]
async fn test_describe_object_without_details() {
    let org = contact_org();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch(
            "describe_object",
            &json!({"object_name": "Contact", "include_field_details": "false"}),
        )
        .await;

    let payload = result.result.unwrap();
    let first = &payload["fields"][0];
    assert_eq!(first["name"], "Id");
    assert!(first.get("type").is_none());
    assert!(first.get("required").is_none());

    let summary = payload["summary"].as_str().unwrap();
    assert!(summary.contains("**API Name:** Contact"));
    assert!(!summary.contains("## Fields"));
    assert!(!summary.contains("## Relationship Fields"));
}

#[tokio::test]
async fn test_describe_unknown_object_is_not_found() {
    let org = FakeOrg::new();
    org.on(
        HttpMethod::Get,
        &format!("{DATA}/sobjects/Nope__c/describe"),
        vec![sf_error(404, "NOT_FOUND", "The requested resource does not exist")],
    );
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("get_object_fields", &json!({"object_name": "Nope__c"}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, "NotFound");
    assert_eq!(error.code, "NOT_FOUND");
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_every_call_refetches() {
    let org = contact_org();
    let (dispatcher, _auth) = dispatcher(&org);

    for _ in 0..3 {
        let result = dispatcher
            .dispatch("get_object_fields", &json!({"object_name": "Contact"}))
            .await;
        assert!(result.success);
    }

    assert_eq!(org.calls_to(&format!("{DATA}/sobjects/Contact/describe")), 3);
}

#[tokio::test]
async fn test_object_name_with_path_characters_rejected() {
    let org = FakeOrg::new();
    let (dispatcher, _auth) = dispatcher(&org);

    let result = dispatcher
        .dispatch("describe_object", &json!({"object_name": "Account/../../limits"}))
        .await;

    assert_eq!(result.error_kind(), Some("ValidationError"));
    assert_eq!(org.call_count(), 0);
}
