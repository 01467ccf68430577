//! Field taxonomy
//!
//! Two closed sets of field kinds:
//!
//! - [`FieldType`] for custom-object fields
//! - [`ModelFieldType`] for Einstein Studio model fields
//!
//! Each kind has exactly one parse rule here and one translation rule in
//! its translator, so adding a kind is a compile error until both exist.

use serde::Serialize;
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::validator::{coerce_bool, coerce_string, coerce_u32, optional_string};

/// Suffix every custom object and custom field API name must carry
pub const CUSTOM_SUFFIX: &str = "__c";

pub const DEFAULT_TEXT_LENGTH: u32 = 100;
pub const MAX_TEXT_LENGTH: u32 = 255;
pub const DEFAULT_LONG_TEXT_LENGTH: u32 = 32_768;
pub const MAX_LONG_TEXT_LENGTH: u32 = 131_072;
pub const DEFAULT_VISIBLE_LINES: u32 = 3;
pub const DEFAULT_PRECISION: u32 = 18;
pub const DEFAULT_SCALE: u32 = 0;
pub const MAX_PRECISION: u32 = 18;

/// Custom-object field type tags accepted by the validator
pub const FIELD_TYPE_TAGS: &[&str] = &["Text", "LongText", "Number", "Checkbox", "Picklist", "Lookup"];

/// Einstein field type tags accepted by the validator
pub const MODEL_FIELD_TYPE_TAGS: &[&str] = &["Text", "Number"];

/// Einstein data role tags
pub const DATA_ROLE_TAGS: &[&str] = &["Categorical", "Numerical"];

/// A custom field to attach to an object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub label: String,
    pub api_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub field_type: FieldType,
}

/// Type-specific attributes of a custom field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FieldType {
    Text {
        length: u32,
    },
    LongText {
        length: u32,
        visible_lines: u32,
    },
    Number {
        precision: u32,
        scale: u32,
    },
    Checkbox {
        default_value: bool,
    },
    Picklist {
        values: Vec<String>,
    },
    Lookup {
        reference_to: String,
        relationship_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        relationship_label: Option<String>,
    },
}

impl FieldType {
    /// The tag the caller used for this type
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "Text",
            FieldType::LongText { .. } => "LongText",
            FieldType::Number { .. } => "Number",
            FieldType::Checkbox { .. } => "Checkbox",
            FieldType::Picklist { .. } => "Picklist",
            FieldType::Lookup { .. } => "Lookup",
        }
    }
}

impl FieldSpec {
    /// Parse one entry of a custom-object field list
    ///
    /// `path` is the entry's location, e.g. `fields[2]`; errors point at
    /// the offending attribute below it.
    pub fn from_value(value: &Value, path: &str) -> BridgeResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| BridgeError::validation(path, "expected an object"))?;

        let label = coerce_string(obj.get("label"), &format!("{path}.label"))?;
        let api_name_path = format!("{path}.api_name");
        let api_name = coerce_string(obj.get("api_name"), &api_name_path)?;
        validate_api_name(&api_name, &api_name_path)?;
        let description = optional_string(obj.get("description"), &format!("{path}.description"))?;

        let tag_path = format!("{path}.type");
        let tag = match obj.get("type") {
            None | Some(Value::Null) => "Text".to_string(),
            other => coerce_string(other, &tag_path)?,
        };

        let field_type = match tag.as_str() {
            "Text" => FieldType::Text {
                length: bounded(obj.get("length"), &format!("{path}.length"), DEFAULT_TEXT_LENGTH, 1, MAX_TEXT_LENGTH)?,
            },
            "LongText" => FieldType::LongText {
                length: bounded(
                    obj.get("length"),
                    &format!("{path}.length"),
                    DEFAULT_LONG_TEXT_LENGTH,
                    256,
                    MAX_LONG_TEXT_LENGTH,
                )?,
                visible_lines: bounded(
                    obj.get("visible_lines"),
                    &format!("{path}.visible_lines"),
                    DEFAULT_VISIBLE_LINES,
                    2,
                    50,
                )?,
            },
            "Number" => {
                let precision = bounded(
                    obj.get("precision"),
                    &format!("{path}.precision"),
                    DEFAULT_PRECISION,
                    1,
                    MAX_PRECISION,
                )?;
                let scale = bounded(obj.get("scale"), &format!("{path}.scale"), DEFAULT_SCALE, 0, MAX_PRECISION)?;
                if scale > precision {
                    return Err(BridgeError::validation(
                        format!("{path}.scale"),
                        format!("scale {scale} exceeds precision {precision}"),
                    ));
                }
                FieldType::Number { precision, scale }
            }
            "Checkbox" => FieldType::Checkbox {
                default_value: match obj.get("default_value").or_else(|| obj.get("defaultValue")) {
                    None | Some(Value::Null) => false,
                    Some(v) => coerce_bool(v, &format!("{path}.default_value"))?,
                },
            },
            "Picklist" => FieldType::Picklist {
                values: picklist_values(obj.get("picklist_values"), &format!("{path}.picklist_values"))?,
            },
            "Lookup" => {
                let reference_to = coerce_string(
                    obj.get("reference_to").or_else(|| obj.get("referenceTo")),
                    &format!("{path}.reference_to"),
                )?;
                let relationship_path = format!("{path}.relationship_name");
                let relationship_name = match optional_string(
                    obj.get("relationship_name").or_else(|| obj.get("relationshipName")),
                    &relationship_path,
                )? {
                    Some(name) => {
                        validate_developer_name(&name, &relationship_path)?;
                        name
                    }
                    None => api_name_stem(&api_name).to_string(),
                };
                let relationship_label = optional_string(
                    obj.get("relationship_label").or_else(|| obj.get("relationshipLabel")),
                    &format!("{path}.relationship_label"),
                )?;
                FieldType::Lookup {
                    reference_to,
                    relationship_name,
                    relationship_label,
                }
            }
            other => {
                return Err(BridgeError::validation(
                    tag_path,
                    format!("unsupported field type '{}', expected one of {}", other, FIELD_TYPE_TAGS.join(", ")),
                ));
            }
        };

        Ok(FieldSpec {
            label,
            api_name,
            description,
            field_type,
        })
    }
}

fn bounded(value: Option<&Value>, path: &str, default: u32, min: u32, max: u32) -> BridgeResult<u32> {
    let n = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => coerce_u32(v, path)?,
    };
    if n < min || n > max {
        return Err(BridgeError::validation(path, format!("must be between {min} and {max}, got {n}")));
    }
    Ok(n)
}

fn picklist_values(value: Option<&Value>, path: &str) -> BridgeResult<Vec<String>> {
    let items = match value {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => {
            return Err(BridgeError::validation(path, "Picklist fields require a non-empty list of values"));
        }
        Some(_) => return Err(BridgeError::validation(path, "expected a list of strings")),
    };

    if items.is_empty() {
        return Err(BridgeError::validation(path, "Picklist fields require a non-empty list of values"));
    }

    let mut values: Vec<String> = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let v = coerce_string(Some(item), &item_path)?;
        if values.iter().any(|existing| existing.eq_ignore_ascii_case(&v)) {
            return Err(BridgeError::validation(item_path, format!("duplicate picklist value '{v}'")));
        }
        values.push(v);
    }
    Ok(values)
}

/// Check a custom API name: `Stem__c`, where the stem starts with a letter,
/// uses ASCII letters, digits and single underscores, and does not end
/// with an underscore
pub fn validate_api_name(name: &str, path: &str) -> BridgeResult<()> {
    let stem = name.strip_suffix(CUSTOM_SUFFIX).ok_or_else(|| {
        BridgeError::validation(path, format!("API name '{name}' must end with '{CUSTOM_SUFFIX}'"))
    })?;
    validate_developer_name(stem, path)
        .map_err(|_| BridgeError::validation(path, format!(
            "API name '{name}' must start with a letter and use only letters, digits and single underscores before '{CUSTOM_SUFFIX}'"
        )))
}

/// Check a developer name without suffix rules
pub fn validate_developer_name(name: &str, path: &str) -> BridgeResult<()> {
    let starts_with_letter = name.chars().next().map_or(false, |c| c.is_ascii_alphabetic());
    let allowed_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !starts_with_letter || !allowed_chars || name.contains("__") || name.ends_with('_') {
        return Err(BridgeError::validation(
            path,
            format!("'{name}' must start with a letter and use only letters, digits and single underscores"),
        ));
    }
    Ok(())
}

/// `Account_Ref__c` -> `Account_Ref`
pub fn api_name_stem(name: &str) -> &str {
    name.strip_suffix(CUSTOM_SUFFIX).unwrap_or(name)
}

// ═══════════════════════════════════════════════════════════════════════
// Einstein Studio model fields
// ═══════════════════════════════════════════════════════════════════════

/// Field types an Einstein model accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelFieldType {
    Text,
    Number,
}

/// How the model treats a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataRole {
    Categorical,
    Numerical,
}

impl ModelFieldType {
    /// The only role each type can take
    pub fn data_role(&self) -> DataRole {
        match self {
            ModelFieldType::Text => DataRole::Categorical,
            ModelFieldType::Number => DataRole::Numerical,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ModelFieldType::Text => "Text",
            ModelFieldType::Number => "Number",
        }
    }
}

impl DataRole {
    pub fn tag(&self) -> &'static str {
        match self {
            DataRole::Categorical => "Categorical",
            DataRole::Numerical => "Numerical",
        }
    }
}

/// A field in an Einstein model definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelField {
    pub name: String,
    pub label: String,
    pub field_type: ModelFieldType,
    pub ignored: bool,
}

impl ModelField {
    /// Parse one entry of an Einstein field list
    pub fn from_value(value: &Value, path: &str) -> BridgeResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| BridgeError::validation(path, "expected an object"))?;

        let name = coerce_string(obj.get("field_name"), &format!("{path}.field_name"))?;
        let label = coerce_string(obj.get("field_label"), &format!("{path}.field_label"))?;

        let type_path = format!("{path}.field_type");
        let field_type = match coerce_string(obj.get("field_type"), &type_path)?.as_str() {
            "Text" => ModelFieldType::Text,
            "Number" => ModelFieldType::Number,
            other => {
                return Err(BridgeError::validation(
                    type_path,
                    format!("unsupported model field type '{}', expected Text or Number", other),
                ));
            }
        };

        let role_path = format!("{path}.data_type");
        if let Some(role) = optional_string(obj.get("data_type"), &role_path)? {
            let expected = field_type.data_role();
            if role != expected.tag() {
                return Err(BridgeError::validation(
                    role_path,
                    format!("{} fields must be {}, got '{}'", field_type.tag(), expected.tag(), role),
                ));
            }
        }

        let ignored = match obj.get("ignored") {
            None | Some(Value::Null) => false,
            Some(v) => coerce_bool(v, &format!("{path}.ignored"))?,
        };

        Ok(ModelField {
            name,
            label,
            field_type,
            ignored,
        })
    }
}
