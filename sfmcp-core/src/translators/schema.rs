//! Schema introspection
//!
//! Reshapes the org's describe payload into stable output types. Every
//! call re-fetches; nothing is cached across requests.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::backend::BackendClient;
use crate::error::BridgeResult;
use crate::translators::{check_object_name, describe_path};

/// Object-level flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub label: String,
    pub label_plural: String,
    pub custom: bool,
    pub createable: bool,
    pub updateable: bool,
    pub deletable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PicklistEntry {
    pub value: String,
    pub label: String,
    pub default: bool,
}

/// One field of a described object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescription {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    pub required: bool,
    pub unique: bool,
    pub external_id: bool,
    pub createable: bool,
    pub updateable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picklist_values: Option<Vec<PicklistEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
}

/// Result of `get_object_fields`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectFields {
    pub object_name: String,
    pub object_info: ObjectInfo,
    pub fields: Vec<FieldDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub name: String,
    pub label: String,
    pub label_plural: String,
    pub custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    pub createable: bool,
    pub updateable: bool,
    pub deletable: bool,
}

/// Field entry of `describe_object`; type and required only with details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribedField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Result of `describe_object`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDescription {
    pub object: ObjectSummary,
    pub fields: Vec<DescribedField>,
    /// Markdown rendering for display
    pub summary: String,
}

pub struct SchemaTranslator<'a> {
    backend: &'a BackendClient,
}

impl<'a> SchemaTranslator<'a> {
    pub fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    async fn describe(&self, object_name: &str) -> BridgeResult<Value> {
        check_object_name(object_name, "object_name")?;
        self.backend
            .get(&describe_path(self.backend.data_path(), object_name))
            .await
    }

    pub async fn object_fields(&self, object_name: &str) -> BridgeResult<ObjectFields> {
        let describe = self.describe(object_name).await?;
        Ok(ObjectFields {
            object_name: str_at(&describe, "name").unwrap_or_else(|| object_name.to_string()),
            object_info: ObjectInfo {
                label: str_at(&describe, "label").unwrap_or_default(),
                label_plural: str_at(&describe, "labelPlural").unwrap_or_default(),
                custom: flag(&describe, "custom", false),
                createable: flag(&describe, "createable", false),
                updateable: flag(&describe, "updateable", false),
                deletable: flag(&describe, "deletable", false),
            },
            fields: field_descriptions(&describe),
        })
    }

    pub async fn describe_object(
        &self,
        object_name: &str,
        include_field_details: bool,
    ) -> BridgeResult<ObjectDescription> {
        let describe = self.describe(object_name).await?;
        let object = ObjectSummary {
            name: str_at(&describe, "name").unwrap_or_else(|| object_name.to_string()),
            label: str_at(&describe, "label").unwrap_or_default(),
            label_plural: str_at(&describe, "labelPlural").unwrap_or_default(),
            custom: flag(&describe, "custom", false),
            key_prefix: str_at(&describe, "keyPrefix"),
            createable: flag(&describe, "createable", false),
            updateable: flag(&describe, "updateable", false),
            deletable: flag(&describe, "deletable", false),
        };
        let details = field_descriptions(&describe);

        let fields = details
            .iter()
            .map(|f| DescribedField {
                name: f.name.clone(),
                label: f.label.clone(),
                field_type: include_field_details.then(|| f.field_type.clone()),
                required: include_field_details.then_some(f.required),
            })
            .collect();

        let summary = render_summary(&object, &details, include_field_details);

        Ok(ObjectDescription {
            object,
            fields,
            summary,
        })
    }
}

fn str_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

fn flag(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Describe `fields` array in org order
pub fn field_descriptions(describe: &Value) -> Vec<FieldDescription> {
    let Some(fields) = describe.get("fields").and_then(Value::as_array) else {
        return Vec::new();
    };

    fields
        .iter()
        .map(|f| {
            let field_type = str_at(f, "type").unwrap_or_default();
            let is_picklist = field_type == "picklist" || field_type == "multipicklist";
            let is_reference = field_type == "reference";

            FieldDescription {
                name: str_at(f, "name").unwrap_or_default(),
                label: str_at(f, "label").unwrap_or_default(),
                length: f.get("length").and_then(Value::as_u64).filter(|l| *l > 0),
                required: !flag(f, "nillable", true),
                unique: flag(f, "unique", false),
                external_id: flag(f, "externalId", false),
                createable: flag(f, "createable", false),
                updateable: flag(f, "updateable", false),
                picklist_values: is_picklist.then(|| picklist_entries(f)),
                reference_to: is_reference.then(|| {
                    f.get("referenceTo")
                        .and_then(Value::as_array)
                        .map(|targets| targets.iter().filter_map(Value::as_str).map(String::from).collect())
                        .unwrap_or_default()
                }),
                relationship_name: if is_reference { str_at(f, "relationshipName") } else { None },
                field_type,
            }
        })
        .collect()
}

fn picklist_entries(field: &Value) -> Vec<PicklistEntry> {
    field
        .get("picklistValues")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter(|v| flag(v, "active", true))
                .map(|v| PicklistEntry {
                    value: str_at(v, "value").unwrap_or_default(),
                    label: str_at(v, "label").unwrap_or_default(),
                    default: flag(v, "defaultValue", false),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Markdown summary: header always, tables only with details
pub fn render_summary(object: &ObjectSummary, fields: &[FieldDescription], details: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## {} ({})\n", object.label, object.name);
    let _ = writeln!(
        out,
        "**Type:** {}",
        if object.custom { "Custom Object" } else { "Standard Object" }
    );
    let _ = writeln!(out, "**API Name:** {}", object.name);
    let _ = writeln!(out, "**Label:** {}", object.label);
    let _ = writeln!(out, "**Plural Label:** {}", object.label_plural);
    let _ = writeln!(out, "**Key Prefix:** {}", object.key_prefix.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "**Createable:** {}", object.createable);
    let _ = writeln!(out, "**Updateable:** {}", object.updateable);
    let _ = writeln!(out, "**Deletable:** {}", object.deletable);

    if !details {
        return out;
    }

    out.push_str("\n## Fields\n\n");
    out.push_str("| API Name | Label | Type | Required | Unique | External ID |\n");
    out.push_str("|----------|-------|------|----------|--------|-------------|\n");
    for f in fields {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            f.name,
            f.label,
            f.field_type,
            yes_no(f.required),
            yes_no(f.unique),
            yes_no(f.external_id)
        );
    }

    let references: Vec<&FieldDescription> = fields
        .iter()
        .filter(|f| f.reference_to.as_ref().map_or(false, |r| !r.is_empty()))
        .collect();
    if !references.is_empty() {
        out.push_str("\n## Relationship Fields\n\n");
        out.push_str("| API Name | Related To | Relationship Name |\n");
        out.push_str("|----------|------------|-------------------|\n");
        for f in references {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                f.name,
                f.reference_to.as_deref().unwrap_or_default().join(", "),
                f.relationship_name.as_deref().unwrap_or("N/A")
            );
        }
    }

    let picklists: Vec<&FieldDescription> = fields
        .iter()
        .filter(|f| f.picklist_values.as_ref().map_or(false, |v| !v.is_empty()))
        .collect();
    if !picklists.is_empty() {
        out.push_str("\n## Picklist Fields\n");
        for f in picklists {
            let _ = writeln!(out, "\n### {} ({})\n", f.label, f.name);
            out.push_str("| Value | Label | Default |\n");
            out.push_str("|-------|-------|---------|\n");
            for entry in f.picklist_values.as_deref().unwrap_or_default() {
                let _ = writeln!(out, "| {} | {} | {} |", entry.value, entry.label, yes_no(entry.default));
            }
        }
    }

    out
}
