//! Tool schema registry
//!
//! The fixed catalog of tools the bridge exposes. Built once on first use
//! and read-only afterwards. Each [`ToolDescriptor`] is the single source
//! of truth for both validation and the `inputSchema` published to
//! clients.

use std::sync::OnceLock;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::fields::{DATA_ROLE_TAGS, FIELD_TYPE_TAGS, MODEL_FIELD_TYPE_TAGS};

/// Tool names
pub mod tool_names {
    pub const CREATE_OBJECT: &str = "create_object";
    pub const CREATE_OBJECT_WITH_FIELDS: &str = "create_object_with_fields";
    pub const RUN_SOQL_QUERY: &str = "run_soql_query";
    pub const RUN_SOSL_SEARCH: &str = "run_sosl_search";
    pub const GET_OBJECT_FIELDS: &str = "get_object_fields";
    pub const DESCRIBE_OBJECT: &str = "describe_object";
    pub const CREATE_EINSTEIN_MODEL: &str = "create_einstein_model";
}

pub const MODEL_CAPABILITIES: &[&str] = &["BinaryClassification", "Regression", "MultiClassification"];
pub const MODEL_GOALS: &[&str] = &["Maximize", "Minimize"];
pub const MODEL_ALGORITHMS: &[&str] = &["XGBoost", "LinearRegression", "LogisticRegression"];

/// Which translator handles a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateObject,
    CreateObjectWithFields,
    RunSoqlQuery,
    RunSoslSearch,
    GetObjectFields,
    DescribeObject,
    CreateEinsteinModel,
}

/// Declared shape of a tool's successful result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultShape {
    ObjectCreation,
    QueryRecords,
    SearchGroups,
    FieldList,
    ObjectDescription,
    ModelDefinition,
}

/// Which field taxonomy a field-list parameter uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldContext {
    CustomObject,
    EinsteinModel,
}

/// Parameter kinds the validator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Enum(&'static [&'static str]),
    FieldList(FieldContext),
}

/// One declared parameter
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParameterSpec {
    fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn one_of(name: &'static str, allowed: &'static [&'static str], description: &'static str) -> Self {
        Self::new(name, ParamKind::Enum(allowed), description)
    }

    pub fn field_list(name: &'static str, context: FieldContext, description: &'static str) -> Self {
        Self::new(name, ParamKind::FieldList(context), description)
    }

    /// Mark the parameter as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the caller omits the parameter
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// JSON-Schema fragment for this parameter
    pub fn schema(&self) -> Value {
        let mut schema = match self.kind {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Number => json!({"type": "number"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::Enum(allowed) => json!({"type": "string", "enum": allowed}),
            ParamKind::FieldList(FieldContext::CustomObject) => json!({
                "type": "array",
                "items": custom_field_schema(),
            }),
            ParamKind::FieldList(FieldContext::EinsteinModel) => json!({
                "type": "array",
                "items": model_field_schema(),
            }),
        };

        if let Some(obj) = schema.as_object_mut() {
            obj.insert("description".to_string(), Value::String(self.description.to_string()));
            if let Some(default) = &self.default {
                obj.insert("default".to_string(), default.clone());
            }
        }
        schema
    }
}

fn custom_field_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "label": {"type": "string", "description": "Display name of the field"},
            "api_name": {"type": "string", "description": "API name of the field, ending in __c"},
            "description": {"type": "string"},
            "type": {"type": "string", "enum": FIELD_TYPE_TAGS, "default": "Text"},
            "length": {"type": "number", "description": "Text and LongText length"},
            "visible_lines": {"type": "number", "description": "LongText editor height"},
            "precision": {"type": "number", "description": "Number precision (default 18)"},
            "scale": {"type": "number", "description": "Number scale (default 0)"},
            "default_value": {"type": "boolean", "description": "Checkbox default"},
            "picklist_values": {"type": "array", "items": {"type": "string"}},
            "reference_to": {"type": "string", "description": "Lookup target object"},
            "relationship_name": {"type": "string"},
            "relationship_label": {"type": "string"}
        },
        "required": ["label", "api_name"]
    })
}

fn model_field_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "field_name": {"type": "string", "description": "API name of the field"},
            "field_label": {"type": "string", "description": "Display label of the field"},
            "field_type": {"type": "string", "enum": MODEL_FIELD_TYPE_TAGS},
            "data_type": {"type": "string", "enum": DATA_ROLE_TAGS},
            "ignored": {"type": "boolean", "default": false}
        },
        "required": ["field_name", "field_label", "field_type"]
    })
}

/// A tool in the catalog
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    pub params: Vec<ParameterSpec>,
    pub result_shape: ResultShape,
}

impl ToolDescriptor {
    /// Names of the required parameters, in declaration order
    pub fn required_params(&self) -> Vec<&'static str> {
        self.params.iter().filter(|p| p.required).map(|p| p.name).collect()
    }

    pub fn param(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON-Schema object describing the tool's parameters
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params(),
        })
    }
}

/// Discovery view of a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub required: Vec<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    pub result_shape: ResultShape,
}

impl From<&ToolDescriptor> for ToolSummary {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.to_string(),
            required: tool.required_params().into_iter().map(String::from).collect(),
            input_schema: tool.input_schema(),
            result_shape: tool.result_shape,
        }
    }
}

/// The catalog
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

static REGISTRY: OnceLock<ToolRegistry> = OnceLock::new();

impl ToolRegistry {
    /// The process-wide catalog
    pub fn global() -> &'static ToolRegistry {
        REGISTRY.get_or_init(ToolRegistry::build)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    fn build() -> Self {
        use tool_names::*;

        let object_params = || {
            vec![
                ParameterSpec::string("name", "Display label of the object").required(),
                ParameterSpec::string("plural_name", "Plural label of the object").required(),
                ParameterSpec::string("api_name", "API name of the object, ending in __c").required(),
                ParameterSpec::string("description", "Short description of the object's purpose"),
            ]
        };

        let mut with_fields = object_params();
        with_fields.push(
            ParameterSpec::field_list("fields", FieldContext::CustomObject, "Fields to attach, in order")
                .required(),
        );

        let tools = vec![
            ToolDescriptor {
                name: CREATE_OBJECT,
                description: "Create a new custom object in Salesforce",
                kind: ToolKind::CreateObject,
                params: object_params(),
                result_shape: ResultShape::ObjectCreation,
            },
            ToolDescriptor {
                name: CREATE_OBJECT_WITH_FIELDS,
                description: "Create a new custom object with the given fields in Salesforce",
                kind: ToolKind::CreateObjectWithFields,
                params: with_fields,
                result_shape: ResultShape::ObjectCreation,
            },
            ToolDescriptor {
                name: RUN_SOQL_QUERY,
                description: "Execute a SOQL query against Salesforce and return every matching record",
                kind: ToolKind::RunSoqlQuery,
                params: vec![
                    ParameterSpec::string(
                        "query",
                        "The SOQL query to execute (e.g., SELECT Id, Name FROM Account LIMIT 10)",
                    )
                    .required(),
                    ParameterSpec::number("max_records", "Stop after this many records"),
                ],
                result_shape: ResultShape::QueryRecords,
            },
            ToolDescriptor {
                name: RUN_SOSL_SEARCH,
                description: "Execute a SOSL search against Salesforce",
                kind: ToolKind::RunSoslSearch,
                params: vec![ParameterSpec::string(
                    "search",
                    "The SOSL search string (e.g., FIND {MyCompany} IN ALL FIELDS RETURNING Account(Id, Name))",
                )
                .required()],
                result_shape: ResultShape::SearchGroups,
            },
            ToolDescriptor {
                name: GET_OBJECT_FIELDS,
                description: "Retrieve the fields of a Salesforce object",
                kind: ToolKind::GetObjectFields,
                params: vec![ParameterSpec::string(
                    "object_name",
                    "API name of the object (e.g., Account, Contact, MyCustomObject__c)",
                )
                .required()],
                result_shape: ResultShape::FieldList,
            },
            ToolDescriptor {
                name: DESCRIBE_OBJECT,
                description: "Describe a Salesforce object, its fields and relationships",
                kind: ToolKind::DescribeObject,
                params: vec![
                    ParameterSpec::string("object_name", "API name of the object (e.g., Account, Custom_Object__c)")
                        .required(),
                    ParameterSpec::boolean("include_field_details", "Include detailed field information")
                        .with_default(json!(true)),
                ],
                result_shape: ResultShape::ObjectDescription,
            },
            ToolDescriptor {
                name: CREATE_EINSTEIN_MODEL,
                description: "Define an Einstein Studio predictive model over a data source",
                kind: ToolKind::CreateEinsteinModel,
                params: vec![
                    ParameterSpec::string("model_name", "Name of the model").required(),
                    ParameterSpec::string("description", "What the model predicts").required(),
                    ParameterSpec::one_of("model_capability", MODEL_CAPABILITIES, "Capability of the model")
                        .with_default(json!("BinaryClassification")),
                    ParameterSpec::string("outcome_field", "Field holding the outcome (e.g., Converted__c)")
                        .required(),
                    ParameterSpec::one_of("goal", MODEL_GOALS, "Goal for the outcome").with_default(json!("Maximize")),
                    ParameterSpec::string(
                        "data_source",
                        "Data model object holding training data (e.g., Lead_Model_Training__dlm)",
                    )
                    .required(),
                    ParameterSpec::string("success_value", "Outcome value meaning success")
                        .with_default(json!("true")),
                    ParameterSpec::string("failure_value", "Outcome value meaning failure")
                        .with_default(json!("false")),
                    ParameterSpec::one_of("algorithm_type", MODEL_ALGORITHMS, "Training algorithm")
                        .with_default(json!("XGBoost")),
                    ParameterSpec::field_list("fields", FieldContext::EinsteinModel, "Fields the model uses")
                        .required(),
                ],
                result_shape: ResultShape::ModelDefinition,
            },
        ];

        Self { tools }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names() {
        let registry = ToolRegistry::global();
        assert_eq!(
            registry.names(),
            vec![
                "create_object",
                "create_object_with_fields",
                "run_soql_query",
                "run_sosl_search",
                "get_object_fields",
                "describe_object",
                "create_einstein_model",
            ]
        );
    }

    #[test]
    fn test_input_schema_lists_required() {
        let tool = ToolRegistry::global().get("describe_object").unwrap();
        let schema = tool.input_schema();

        assert_eq!(schema["required"], json!(["object_name"]));
        assert_eq!(schema["properties"]["include_field_details"]["default"], true);
    }

    #[test]
    fn test_enum_schema() {
        let tool = ToolRegistry::global().get("create_einstein_model").unwrap();
        let schema = tool.input_schema();

        assert_eq!(
            schema["properties"]["algorithm_type"]["enum"],
            json!(["XGBoost", "LinearRegression", "LogisticRegression"])
        );
        assert_eq!(schema["properties"]["fields"]["type"], "array");
    }
}
