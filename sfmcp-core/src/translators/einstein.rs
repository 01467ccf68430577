//! Einstein Studio model definitions
//!
//! Capability, algorithm and outcome-field rules are checked before any
//! backend call. The bundle is then submitted in one non-retryable POST;
//! the org validates it atomically, so a rejection leaves nothing behind.

use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::BackendClient;
use crate::error::{BridgeError, BridgeResult};
use crate::fields::{ModelField, ModelFieldType};
use crate::validator::ValidatedParams;

/// Model-setup endpoint, relative to the REST data path
pub const MODEL_SETUP_PATH: &str = "/ssot/machine-learning/model-setups";

/// Buckets used for numeric predictors
const NUMBER_BUCKETS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelCapability {
    BinaryClassification,
    Regression,
    MultiClassification,
}

impl ModelCapability {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BinaryClassification" => Some(Self::BinaryClassification),
            "Regression" => Some(Self::Regression),
            "MultiClassification" => Some(Self::MultiClassification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryClassification => "BinaryClassification",
            Self::Regression => "Regression",
            Self::MultiClassification => "MultiClassification",
        }
    }

    /// Outcome type tag in the model setup
    pub fn outcome_type(&self) -> &'static str {
        match self {
            Self::BinaryClassification => "Binary",
            Self::Regression => "Regression",
            Self::MultiClassification => "MultiClass",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Algorithm {
    XGBoost,
    LinearRegression,
    LogisticRegression,
}

impl Algorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "XGBoost" => Some(Self::XGBoost),
            "LinearRegression" => Some(Self::LinearRegression),
            "LogisticRegression" => Some(Self::LogisticRegression),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XGBoost => "XGBoost",
            Self::LinearRegression => "LinearRegression",
            Self::LogisticRegression => "LogisticRegression",
        }
    }

    /// Whether this algorithm can train a model with `capability`
    pub fn supports(&self, capability: ModelCapability) -> bool {
        match self {
            Self::XGBoost => true,
            Self::LinearRegression => capability == ModelCapability::Regression,
            Self::LogisticRegression => capability == ModelCapability::BinaryClassification,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Goal {
    Maximize,
    Minimize,
}

impl Goal {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Maximize" => Some(Self::Maximize),
            "Minimize" => Some(Self::Minimize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maximize => "Maximize",
            Self::Minimize => "Minimize",
        }
    }
}

/// A validated model definition
#[derive(Debug, Clone, PartialEq)]
pub struct EinsteinModelRequest {
    pub model_name: String,
    pub description: String,
    pub capability: ModelCapability,
    pub algorithm: Algorithm,
    pub goal: Goal,
    pub outcome_field: String,
    pub data_source: String,
    pub success_value: String,
    pub failure_value: String,
    pub fields: Vec<ModelField>,
}

fn parse_enum<T>(params: &ValidatedParams, name: &str, parse: fn(&str) -> Option<T>) -> BridgeResult<T> {
    let raw = params.require_string(name)?;
    parse(raw).ok_or_else(|| BridgeError::validation(name, format!("unsupported value '{raw}'")))
}

impl EinsteinModelRequest {
    pub fn from_params(params: &ValidatedParams) -> BridgeResult<Self> {
        let capability = parse_enum(params, "model_capability", ModelCapability::parse)?;
        let algorithm = parse_enum(params, "algorithm_type", Algorithm::parse)?;
        let goal = parse_enum(params, "goal", Goal::parse)?;

        if !algorithm.supports(capability) {
            return Err(BridgeError::validation(
                "algorithm_type",
                format!(
                    "{} cannot train a {} model",
                    algorithm.as_str(),
                    capability.as_str()
                ),
            ));
        }

        let request = Self {
            model_name: params.require_string("model_name")?.to_string(),
            description: params.require_string("description")?.to_string(),
            capability,
            algorithm,
            goal,
            outcome_field: params.require_string("outcome_field")?.to_string(),
            data_source: params.require_string("data_source")?.to_string(),
            success_value: params.string("success_value").unwrap_or("true").to_string(),
            failure_value: params.string("failure_value").unwrap_or("false").to_string(),
            fields: params.model_fields("fields").to_vec(),
        };
        request.check_fields()?;
        Ok(request)
    }

    fn check_fields(&self) -> BridgeResult<()> {
        let outcome = self
            .fields
            .iter()
            .find(|f| f.name == self.outcome_field)
            .ok_or_else(|| {
                BridgeError::validation(
                    "outcome_field",
                    format!("'{}' is not in the field list", self.outcome_field),
                )
            })?;

        if outcome.ignored {
            return Err(BridgeError::validation(
                "outcome_field",
                format!("'{}' is marked ignored", self.outcome_field),
            ));
        }

        if self.capability == ModelCapability::Regression && outcome.field_type != ModelFieldType::Number {
            return Err(BridgeError::validation(
                "outcome_field",
                "Regression models need a Number outcome field",
            ));
        }

        let predictors = self
            .fields
            .iter()
            .filter(|f| f.name != self.outcome_field && !f.ignored)
            .count();
        if predictors == 0 {
            return Err(BridgeError::validation(
                "fields",
                "at least one predictor besides the outcome field is required",
            ));
        }

        Ok(())
    }

    /// `Churn Model-v2` -> `Churn_Model_v2`
    pub fn template_name(&self) -> String {
        self.model_name.replace([' ', '-'], "_")
    }

    /// The model definition bundle
    pub fn bundle(&self) -> Value {
        let outcome_label = self
            .fields
            .iter()
            .find(|f| f.name == self.outcome_field)
            .map(|f| f.label.clone())
            .unwrap_or_else(|| self.outcome_field.clone());

        let mut outcome = json!({
            "name": self.outcome_field,
            "label": outcome_label,
            "type": self.capability.outcome_type(),
            "goal": self.goal.as_str(),
        });
        if self.capability == ModelCapability::BinaryClassification {
            outcome["successValue"] = json!(self.success_value);
            outcome["failureValue"] = json!(self.failure_value);
        }

        // Outcome first, then predictors in caller order
        let mut fields: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| f.name == self.outcome_field)
            .map(field_entry)
            .collect();
        fields.extend(
            self.fields
                .iter()
                .filter(|f| f.name != self.outcome_field)
                .map(field_entry),
        );

        json!({
            "templateName": self.template_name(),
            "label": self.model_name,
            "description": self.description,
            "container": {
                "label": self.model_name,
                "description": self.description,
                "capability": self.capability.as_str(),
                "outcomeField": self.outcome_field,
                "goal": self.goal.as_str(),
            },
            "setup": {
                "description": format!("{} - Model Setup", self.description),
                "dataSource": self.data_source,
                "outcome": outcome,
                "algorithm": self.algorithm.as_str(),
                "fields": fields,
            }
        })
    }
}

fn field_entry(field: &ModelField) -> Value {
    match field.field_type {
        ModelFieldType::Text => json!({
            "type": "Text",
            "name": field.name,
            "label": field.label,
            "dataType": field.field_type.data_role().tag(),
            "ignored": field.ignored,
            "balanced": false,
            "highCardinality": false,
            "includeOther": true,
            "ordering": "Occurrence",
            "sensitive": false,
            "values": [],
        }),
        ModelFieldType::Number => json!({
            "type": "Number",
            "name": field.name,
            "label": field.label,
            "dataType": field.field_type.data_role().tag(),
            "ignored": field.ignored,
            "sensitive": false,
            "bucketingStrategy": {
                "type": "Percentile",
                "numberOfBuckets": NUMBER_BUCKETS,
            },
        }),
    }
}

/// What the org accepted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSubmission {
    pub model_name: String,
    pub template_name: String,
    pub capability: ModelCapability,
    pub algorithm: Algorithm,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub response: Value,
}

pub struct EinsteinTranslator<'a> {
    backend: &'a BackendClient,
}

impl<'a> EinsteinTranslator<'a> {
    pub fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// Submit the bundle once; every org rejection becomes
    /// [`BridgeError::ModelDefinition`]
    pub async fn create(&self, request: &EinsteinModelRequest) -> BridgeResult<ModelSubmission> {
        let path = format!("{}{}", self.backend.data_path(), MODEL_SETUP_PATH);
        let response = self
            .backend
            .post_once(&path, &request.bundle())
            .await
            .map_err(as_model_rejection)?;

        tracing::info!(
            model = %request.model_name,
            capability = request.capability.as_str(),
            algorithm = request.algorithm.as_str(),
            "Einstein model definition submitted"
        );

        Ok(ModelSubmission {
            model_name: request.model_name.clone(),
            template_name: request.template_name(),
            capability: request.capability,
            algorithm: request.algorithm,
            status: response
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("Submitted")
                .to_string(),
            id: response.get("id").and_then(Value::as_str).map(String::from),
            response,
        })
    }
}

fn as_model_rejection(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Backend { code, message, .. }
        | BridgeError::QuerySyntax { code, message }
        | BridgeError::Permission { code, message }
        | BridgeError::NotFound { code, message } => BridgeError::ModelDefinition { code, message },
        BridgeError::TransientBackend { message, .. } => BridgeError::ModelDefinition {
            code: "TRANSIENT_BACKEND_ERROR".to_string(),
            message,
        },
        other => other,
    }
}
