//! Request validation
//!
//! Checks raw tool parameters against a [`ToolDescriptor`] before any
//! backend call. Validation fails fast on the first violation and reports
//! the offending path, e.g. `fields[2].picklist_values`.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::fields::{FieldSpec, ModelField};
use crate::registry::{FieldContext, ParamKind, ParameterSpec, ToolDescriptor};

/// A parameter value after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Number(f64),
    Boolean(bool),
    ObjectFields(Vec<FieldSpec>),
    ModelFields(Vec<ModelField>),
}

/// Parameters that passed validation, defaults applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams {
    values: BTreeMap<String, ParamValue>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// String or enum value
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String value that the descriptor declares as required
    pub fn require_string(&self, name: &str) -> BridgeResult<&str> {
        self.string(name)
            .ok_or_else(|| BridgeError::validation(name, "required parameter is missing"))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ParamValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ParamValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Custom-object field list, empty when absent
    pub fn object_fields(&self, name: &str) -> &[FieldSpec] {
        match self.values.get(name) {
            Some(ParamValue::ObjectFields(fields)) => fields,
            _ => &[],
        }
    }

    /// Einstein field list, empty when absent
    pub fn model_fields(&self, name: &str) -> &[ModelField] {
        match self.values.get(name) {
            Some(ParamValue::ModelFields(fields)) => fields,
            _ => &[],
        }
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }
}

/// Validate `raw` against `descriptor`
///
/// Unknown extra parameters are ignored. Optional parameters that are
/// absent take their declared default, if any.
pub fn validate(descriptor: &ToolDescriptor, raw: &Value) -> BridgeResult<ValidatedParams> {
    let empty = serde_json::Map::new();
    let obj = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(BridgeError::validation("$", "parameters must be a JSON object")),
    };

    let mut validated = ValidatedParams::default();

    for spec in &descriptor.params {
        let supplied = match obj.get(spec.name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() && !matches!(spec.kind, ParamKind::FieldList(_)) => None,
            Some(v) => Some(v),
        };

        let value = match (supplied, &spec.default) {
            (Some(v), _) => v,
            (None, Some(default)) => default,
            (None, None) if spec.required => {
                return Err(BridgeError::validation(spec.name, "required parameter is missing"));
            }
            (None, None) => continue,
        };

        validated.insert(spec.name, coerce_param(spec, value)?);
    }

    Ok(validated)
}

fn coerce_param(spec: &ParameterSpec, value: &Value) -> BridgeResult<ParamValue> {
    let path = spec.name;
    match spec.kind {
        ParamKind::String => coerce_string(Some(value), path).map(ParamValue::String),
        ParamKind::Number => coerce_number(value, path).map(ParamValue::Number),
        ParamKind::Boolean => coerce_bool(value, path).map(ParamValue::Boolean),
        ParamKind::Enum(allowed) => {
            let s = coerce_string(Some(value), path)?;
            if !allowed.contains(&s.as_str()) {
                return Err(BridgeError::validation(
                    path,
                    format!("'{}' is not one of {}", s, allowed.join(", ")),
                ));
            }
            Ok(ParamValue::String(s))
        }
        ParamKind::FieldList(context) => {
            let items = value
                .as_array()
                .ok_or_else(|| BridgeError::validation(path, "expected a list of field definitions"))?;
            match context {
                FieldContext::CustomObject => object_fields(items, path).map(ParamValue::ObjectFields),
                FieldContext::EinsteinModel => model_fields(items, path).map(ParamValue::ModelFields),
            }
        }
    }
}

fn object_fields(items: &[Value], path: &str) -> BridgeResult<Vec<FieldSpec>> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let field = FieldSpec::from_value(item, &item_path)?;
        if !seen.insert(field.api_name.to_ascii_lowercase()) {
            return Err(BridgeError::validation(
                format!("{item_path}.api_name"),
                format!("duplicate field API name '{}'", field.api_name),
            ));
        }
        fields.push(field);
    }
    Ok(fields)
}

fn model_fields(items: &[Value], path: &str) -> BridgeResult<Vec<ModelField>> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let field = ModelField::from_value(item, &item_path)?;
        if !seen.insert(field.name.clone()) {
            return Err(BridgeError::validation(
                format!("{item_path}.field_name"),
                format!("duplicate model field '{}'", field.name),
            ));
        }
        fields.push(field);
    }
    Ok(fields)
}

// ═══════════════════════════════════════════════════════════════════════
// Coercions shared with the field parsers
// ═══════════════════════════════════════════════════════════════════════

/// Required non-empty string; numbers and booleans are accepted as text
pub(crate) fn coerce_string(value: Option<&Value>, path: &str) -> BridgeResult<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(BridgeError::validation(path, "must not be empty")),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        None | Some(Value::Null) => Err(BridgeError::validation(path, "required attribute is missing")),
        Some(_) => Err(BridgeError::validation(path, "expected a string")),
    }
}

/// Optional string; absent, null and blank all mean `None`
pub(crate) fn optional_string(value: Option<&Value>, path: &str) -> BridgeResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        other => coerce_string(other, path).map(Some),
    }
}

pub(crate) fn coerce_number(value: &Value, path: &str) -> BridgeResult<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(BridgeError::validation(path, format!("expected a number, got {value}"))),
    }
}

pub(crate) fn coerce_u32(value: &Value, path: &str) -> BridgeResult<u32> {
    let n = coerce_number(value, path)?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return Err(BridgeError::validation(path, format!("expected a non-negative integer, got {value}")));
    }
    Ok(n as u32)
}

pub(crate) fn coerce_bool(value: &Value, path: &str) -> BridgeResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(BridgeError::validation(path, format!("expected a boolean, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number_from_string() {
        assert_eq!(coerce_number(&json!("42"), "n").unwrap(), 42.0);
        assert!(coerce_number(&json!("forty"), "n").is_err());
        assert!(coerce_number(&json!(true), "n").is_err());
    }

    #[test]
    fn test_coerce_u32_rejects_fractions() {
        assert_eq!(coerce_u32(&json!(7), "n").unwrap(), 7);
        assert!(coerce_u32(&json!(7.5), "n").is_err());
        assert!(coerce_u32(&json!(-1), "n").is_err());
    }

    #[test]
    fn test_coerce_bool_from_string() {
        assert!(coerce_bool(&json!("TRUE"), "b").unwrap());
        assert!(!coerce_bool(&json!("false"), "b").unwrap());
        assert!(coerce_bool(&json!("yes"), "b").is_err());
    }

    #[test]
    fn test_optional_string_blank_is_none() {
        assert_eq!(optional_string(Some(&json!("   ")), "s").unwrap(), None);
        assert_eq!(optional_string(None, "s").unwrap(), None);
        assert_eq!(optional_string(Some(&json!(" x ")), "s").unwrap(), Some("x".to_string()));
    }
}
