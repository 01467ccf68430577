//! Custom object and field creation
//!
//! One Tooling API call creates the object shell, then one call per field
//! attaches it. Field attachment is fail-fast: the first failing field
//! stops the loop. Nothing is rolled back; the [`ObjectCreationReport`]
//! says exactly which fields exist, which failed and which were never
//! sent, so the caller can retry only what is missing.
//!
//! Every attached field is then granted read and edit access on the
//! System Administrator profile's permission set. A refused grant is
//! recorded on that field and does not stop the loop.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::backend::BackendClient;
use crate::error::{BridgeError, BridgeResult};
use crate::fields::{validate_api_name, FieldSpec, FieldType};
use crate::translators::{check_object_name, describe_path, tooling_path};
use crate::validator::ValidatedParams;

/// Code recorded when a Lookup points at an object that does not exist
pub const LOOKUP_TARGET_MISSING: &str = "LOOKUP_TARGET_NOT_FOUND";

/// Profile whose permission set receives access to new fields
pub const ADMIN_PROFILE: &str = "System Administrator";

/// Code recorded when the org has no permission set for [`ADMIN_PROFILE`]
pub const ADMIN_PERMISSION_SET_MISSING: &str = "ADMIN_PERMISSION_SET_NOT_FOUND";

/// A custom object to create
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCreationRequest {
    pub label: String,
    pub plural_label: String,
    pub api_name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl ObjectCreationRequest {
    /// Build from validated `create_object` / `create_object_with_fields`
    /// parameters
    pub fn from_params(params: &ValidatedParams) -> BridgeResult<Self> {
        let api_name = params.require_string("api_name")?.to_string();
        validate_api_name(&api_name, "api_name")?;

        let fields = params.object_fields("fields").to_vec();
        let plural_label = params.string("plural_name").unwrap_or_default().to_string();
        if !fields.is_empty() && plural_label.is_empty() {
            return Err(BridgeError::validation(
                "plural_name",
                "a plural label is required when fields are supplied",
            ));
        }

        Ok(Self {
            label: params.require_string("name")?.to_string(),
            plural_label,
            api_name,
            description: params.string("description").map(String::from),
            fields,
        })
    }
}

/// A field that was attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub api_name: String,
    pub label: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub access: FieldAccess,
}

/// Field-level security outcome for an attached field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldAccess {
    Granted { permission_set_id: String },
    NotGranted { code: String, message: String },
}

impl FieldAccess {
    fn not_granted(err: &BridgeError) -> Self {
        FieldAccess::NotGranted {
            code: err.error_code(),
            message: err.to_string(),
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, FieldAccess::Granted { .. })
    }
}

/// A field the backend refused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub api_name: String,
    pub label: String,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

/// Per-field outcome of an object creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectCreationReport {
    pub object_api_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub succeeded: Vec<FieldOutcome>,
    pub failed: Vec<FieldFailure>,
    pub not_attempted: Vec<String>,
}

impl ObjectCreationReport {
    fn new(object_api_name: &str, object_id: Option<String>) -> Self {
        Self {
            object_api_name: object_api_name.to_string(),
            object_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
            not_attempted: Vec::new(),
        }
    }

    /// Every requested field was attached
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty()
    }

    /// e.g. `2 attached, 1 failed (Status__c), 3 not attempted`
    pub fn outcome_summary(&self) -> String {
        let failed: Vec<&str> = self.failed.iter().map(|f| f.api_name.as_str()).collect();
        let mut summary = format!("{} attached, {} failed", self.succeeded.len(), self.failed.len());
        if !failed.is_empty() {
            summary.push_str(&format!(" ({})", failed.join(", ")));
        }
        summary.push_str(&format!(", {} not attempted", self.not_attempted.len()));
        summary
    }
}

/// Tooling API body for the object shell
pub fn object_metadata(request: &ObjectCreationRequest) -> Value {
    let mut metadata = Map::new();
    let plural_label = if request.plural_label.is_empty() {
        &request.label
    } else {
        &request.plural_label
    };
    metadata.insert("label".into(), json!(request.label));
    metadata.insert("pluralLabel".into(), json!(plural_label));
    if let Some(description) = &request.description {
        metadata.insert("description".into(), json!(description));
    }
    metadata.insert(
        "nameField".into(),
        json!({"label": format!("{} Name", request.label), "type": "Text"}),
    );
    metadata.insert("deploymentStatus".into(), json!("Deployed"));
    metadata.insert("sharingModel".into(), json!("ReadWrite"));

    json!({"FullName": request.api_name, "Metadata": metadata})
}

/// Tooling API body for one field
pub fn field_metadata(object_api_name: &str, field: &FieldSpec) -> Value {
    let mut metadata = Map::new();
    metadata.insert("label".into(), json!(field.label));
    if let Some(description) = &field.description {
        metadata.insert("description".into(), json!(description));
    }

    match &field.field_type {
        FieldType::Text { length } => {
            metadata.insert("type".into(), json!("Text"));
            metadata.insert("length".into(), json!(length));
        }
        FieldType::LongText { length, visible_lines } => {
            metadata.insert("type".into(), json!("LongTextArea"));
            metadata.insert("length".into(), json!(length));
            metadata.insert("visibleLines".into(), json!(visible_lines));
        }
        FieldType::Number { precision, scale } => {
            metadata.insert("type".into(), json!("Number"));
            metadata.insert("precision".into(), json!(precision));
            metadata.insert("scale".into(), json!(scale));
        }
        FieldType::Checkbox { default_value } => {
            metadata.insert("type".into(), json!("Checkbox"));
            metadata.insert("defaultValue".into(), json!(default_value.to_string()));
        }
        FieldType::Picklist { values } => {
            let values: Vec<Value> = values
                .iter()
                .map(|v| json!({"fullName": v, "label": v, "default": false}))
                .collect();
            metadata.insert("type".into(), json!("Picklist"));
            metadata.insert(
                "valueSet".into(),
                json!({
                    "restricted": true,
                    "valueSetDefinition": {"sorted": false, "value": values}
                }),
            );
        }
        FieldType::Lookup {
            reference_to,
            relationship_name,
            relationship_label,
        } => {
            metadata.insert("type".into(), json!("Lookup"));
            metadata.insert("referenceTo".into(), json!(reference_to));
            metadata.insert("relationshipName".into(), json!(relationship_name));
            metadata.insert(
                "relationshipLabel".into(),
                json!(relationship_label.as_deref().unwrap_or(&field.label)),
            );
            metadata.insert("deleteConstraint".into(), json!("SetNull"));
        }
    }

    json!({
        "FullName": format!("{}.{}", object_api_name, field.api_name),
        "Metadata": metadata,
    })
}

/// REST body granting read and edit on one field
pub fn field_permission(permission_set_id: &str, object_api_name: &str, field_api_name: &str) -> Value {
    json!({
        "ParentId": permission_set_id,
        "SobjectType": object_api_name,
        "Field": format!("{}.{}", object_api_name, field_api_name),
        "PermissionsRead": true,
        "PermissionsEdit": true,
    })
}

/// Creates custom objects through the Tooling API
pub struct ObjectTranslator<'a> {
    backend: &'a BackendClient,
}

impl<'a> ObjectTranslator<'a> {
    pub fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// Create the shell, then attach fields in order
    ///
    /// Returns the report when every field attached. A field failure
    /// returns [`BridgeError::PartialFailure`] carrying the report; a shell
    /// failure returns the backend error and makes no field calls.
    pub async fn create(&self, request: &ObjectCreationRequest) -> BridgeResult<ObjectCreationReport> {
        let shell_path = tooling_path(self.backend.data_path(), "CustomObject");
        let response = self.backend.post(&shell_path, &object_metadata(request)).await?;
        let object_id = created_id(&response)?;

        tracing::info!(
            object = %request.api_name,
            fields = request.fields.len(),
            "Custom object shell created"
        );

        let mut report = ObjectCreationReport::new(&request.api_name, object_id);
        let mut grantee = None;

        for (index, field) in request.fields.iter().enumerate() {
            match self.attach(&request.api_name, field).await {
                Ok(id) => {
                    let access = self.grant_access(&mut grantee, &request.api_name, field).await;
                    report.succeeded.push(FieldOutcome {
                        api_name: field.api_name.clone(),
                        label: field.label.clone(),
                        field_type: field.field_type.tag().to_string(),
                        id,
                        access,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        object = %request.api_name,
                        field = %field.api_name,
                        error = %e,
                        "Field attachment failed, stopping"
                    );
                    report.failed.push(FieldFailure {
                        api_name: field.api_name.clone(),
                        label: field.label.clone(),
                        code: e.error_code(),
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                    report.not_attempted = request.fields[index + 1..]
                        .iter()
                        .map(|f| f.api_name.clone())
                        .collect();
                    break;
                }
            }
        }

        if report.is_complete() {
            Ok(report)
        } else {
            Err(BridgeError::PartialFailure {
                report: Box::new(report),
            })
        }
    }

    async fn attach(&self, object_api_name: &str, field: &FieldSpec) -> BridgeResult<Option<String>> {
        if let FieldType::Lookup { reference_to, .. } = &field.field_type {
            self.ensure_exists(reference_to).await?;
        }

        let path = tooling_path(self.backend.data_path(), "CustomField");
        let response = self
            .backend
            .post(&path, &field_metadata(object_api_name, field))
            .await?;
        created_id(&response)
    }

    /// Grant read/edit on a new field; the permission set is looked up
    /// once per creation and a failed lookup applies to every field
    async fn grant_access(
        &self,
        grantee: &mut Option<Result<String, FieldAccess>>,
        object_api_name: &str,
        field: &FieldSpec,
    ) -> FieldAccess {
        let permission_set_id = match grantee {
            Some(Ok(id)) => id.clone(),
            Some(Err(access)) => return access.clone(),
            None => match self.admin_permission_set().await {
                Ok(id) => {
                    *grantee = Some(Ok(id.clone()));
                    id
                }
                Err(e) => {
                    tracing::warn!(error = %e, "No permission set to grant field access to");
                    let access = FieldAccess::not_granted(&e);
                    *grantee = Some(Err(access.clone()));
                    return access;
                }
            },
        };

        let path = format!("{}/sobjects/FieldPermissions", self.backend.data_path());
        let body = field_permission(&permission_set_id, object_api_name, &field.api_name);
        let granted = match self.backend.post(&path, &body).await {
            Ok(response) => created_id(&response).map(|_| ()),
            Err(e) => Err(e),
        };

        match granted {
            Ok(()) => FieldAccess::Granted { permission_set_id },
            Err(e) => {
                tracing::warn!(
                    object = %object_api_name,
                    field = %field.api_name,
                    error = %e,
                    "Field access grant refused"
                );
                FieldAccess::not_granted(&e)
            }
        }
    }

    async fn admin_permission_set(&self) -> BridgeResult<String> {
        let soql = format!(
            "SELECT Id FROM PermissionSet WHERE IsOwnedByProfile = true AND Profile.Name = '{}' LIMIT 1",
            ADMIN_PROFILE
        );
        let path = format!("{}/query?q={}", self.backend.data_path(), urlencoding::encode(&soql));
        let page = self.backend.get(&path).await?;

        page.get("records")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .and_then(|record| record.get("Id"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| BridgeError::NotFound {
                code: ADMIN_PERMISSION_SET_MISSING.to_string(),
                message: format!("no permission set owned by the '{}' profile", ADMIN_PROFILE),
            })
    }

    async fn ensure_exists(&self, object_name: &str) -> BridgeResult<()> {
        check_object_name(object_name, "reference_to")?;
        let path = describe_path(self.backend.data_path(), object_name);
        match self.backend.get(&path).await {
            Ok(_) => Ok(()),
            Err(BridgeError::NotFound { .. }) => Err(BridgeError::NotFound {
                code: LOOKUP_TARGET_MISSING.to_string(),
                message: format!("lookup target '{}' does not exist", object_name),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Id from a Tooling create response, or the error it reports
fn created_id(response: &Value) -> BridgeResult<Option<String>> {
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        let error = response
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first());
        let code = error
            .and_then(|e| e.get("statusCode").or_else(|| e.get("errorCode")))
            .and_then(Value::as_str)
            .unwrap_or("CREATE_FAILED");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("backend reported failure");
        return Err(BridgeError::Backend {
            status: 200,
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    Ok(response.get("id").and_then(Value::as_str).map(String::from))
}
