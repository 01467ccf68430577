//! Dispatcher
//!
//! The single entry point for tool calls: registry lookup, validation,
//! translator routing, response mapping. No business logic lives here.

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::mapper::{map_result, ToolResult};
use crate::registry::{ToolDescriptor, ToolKind, ToolRegistry, ToolSummary};
use crate::translators::{
    EinsteinModelRequest, EinsteinTranslator, ModelSubmission, ObjectCreationReport,
    ObjectCreationRequest, ObjectTranslator, QueryRecords, QueryRequest, QueryTranslator,
    SchemaTranslator, SearchGroups,
};
use crate::validator::{validate, ValidatedParams};

/// Routes tool calls to translators
pub struct Dispatcher {
    backend: BackendClient,
    config: BridgeConfig,
    registry: &'static ToolRegistry,
}

impl Dispatcher {
    pub fn new(backend: BackendClient, config: BridgeConfig) -> Self {
        Self {
            backend,
            config,
            registry: ToolRegistry::global(),
        }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The tool catalog for discovery
    pub fn list_tools(&self) -> Vec<ToolSummary> {
        self.registry.iter().map(ToolSummary::from).collect()
    }

    /// Run one tool call and wrap the outcome
    pub async fn dispatch(&self, tool_name: &str, params: &Value) -> ToolResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", tool = %tool_name, request_id = %request_id);

        async {
            let started = std::time::Instant::now();
            let result = self.dispatch_inner(tool_name, params).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result.error.as_ref() {
                None => tracing::info!(elapsed_ms, "Tool call succeeded"),
                Some(e) if e.retryable => {
                    tracing::warn!(elapsed_ms, kind = %e.kind, code = %e.code, "Tool call failed (retryable)")
                }
                Some(e) => tracing::info!(elapsed_ms, kind = %e.kind, code = %e.code, "Tool call failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch_inner(&self, tool_name: &str, params: &Value) -> ToolResult {
        let descriptor = match self.registry.get(tool_name) {
            Some(descriptor) => descriptor,
            None => {
                return ToolResult::err(&BridgeError::UnknownTool {
                    name: tool_name.to_string(),
                })
            }
        };

        let validated = match validate(descriptor, params) {
            Ok(validated) => validated,
            Err(e) => return ToolResult::err(&e),
        };

        self.route(descriptor, &validated).await
    }

    async fn route(&self, descriptor: &ToolDescriptor, params: &ValidatedParams) -> ToolResult {
        match descriptor.kind {
            ToolKind::CreateObject | ToolKind::CreateObjectWithFields => {
                map_result(self.create_object(params).await)
            }
            ToolKind::RunSoqlQuery => map_result(self.run_soql(params).await),
            ToolKind::RunSoslSearch => map_result(self.run_sosl(params).await),
            ToolKind::GetObjectFields => {
                let schema = SchemaTranslator::new(&self.backend);
                map_result(match params.require_string("object_name") {
                    Ok(name) => schema.object_fields(name).await,
                    Err(e) => Err(e),
                })
            }
            ToolKind::DescribeObject => {
                let schema = SchemaTranslator::new(&self.backend);
                let details = params.boolean("include_field_details").unwrap_or(true);
                map_result(match params.require_string("object_name") {
                    Ok(name) => schema.describe_object(name, details).await,
                    Err(e) => Err(e),
                })
            }
            ToolKind::CreateEinsteinModel => map_result(self.create_model(params).await),
        }
    }

    async fn create_object(&self, params: &ValidatedParams) -> BridgeResult<ObjectCreationReport> {
        let request = ObjectCreationRequest::from_params(params)?;
        ObjectTranslator::new(&self.backend).create(&request).await
    }

    async fn run_soql(&self, params: &ValidatedParams) -> BridgeResult<QueryRecords> {
        let request = QueryRequest::from_params(params, "query")?;
        QueryTranslator::new(&self.backend, self.config.max_query_records)
            .run_soql(&request)
            .await
    }

    async fn run_sosl(&self, params: &ValidatedParams) -> BridgeResult<SearchGroups> {
        let request = QueryRequest::from_params(params, "search")?;
        QueryTranslator::new(&self.backend, self.config.max_query_records)
            .run_sosl(&request)
            .await
    }

    async fn create_model(&self, params: &ValidatedParams) -> BridgeResult<ModelSubmission> {
        let request = EinsteinModelRequest::from_params(params)?;
        EinsteinTranslator::new(&self.backend).create(&request).await
    }
}
