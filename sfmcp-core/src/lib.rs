//! # sfmcp-core - Salesforce tool-dispatch bridge
//!
//! Exposes a fixed set of Salesforce operations as named tools so that AI
//! agents can create schema, run queries and define Einstein Studio models
//! without holding org credentials or knowing the REST and Tooling API
//! shapes.
//!
//! ## Architecture
//!
//! ```text
//!   dispatch(tool, params)
//!          │
//!          ▼
//!   ┌──────────────┐   ┌────────────┐
//!   │  Dispatcher  │──▶│  Registry  │  fixed catalog, inputSchema
//!   └──────┬───────┘   └────────────┘
//!          │ validate
//!          ▼
//!   ┌──────────────┐
//!   │  Validator   │  coercion, defaults, field taxonomy
//!   └──────┬───────┘
//!          │ route
//!          ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ Translators: object │ query │ schema │ einstein │
//!   └──────┬───────────────────────────────────────┘
//!          ▼
//!   ┌──────────────┐   ┌────────────────┐
//!   │BackendClient │──▶│ SessionManager │  one session, single refresh gate
//!   └──────┬───────┘   └────────────────┘
//!          │ retry, permits, classification
//!          ▼
//!     OrgTransport (reqwest)
//! ```
//!
//! Every outcome comes back through the [`mapper`] as a [`ToolResult`].
//!
//! ## Example
//!
//! ```rust
//! use sfmcp_core::registry::ToolRegistry;
//! use sfmcp_core::validator::validate;
//! use serde_json::json;
//!
//! let tool = ToolRegistry::global().get("describe_object").unwrap();
//! let params = validate(tool, &json!({"object_name": "Account"})).unwrap();
//!
//! assert_eq!(params.string("object_name"), Some("Account"));
//! assert_eq!(params.boolean("include_field_details"), Some(true));
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fields;
pub mod mapper;
pub mod registry;
pub mod session;
pub mod translators;
pub mod validator;

// Re-export main types
pub use auth::SoapLogin;
pub use backend::{BackendClient, HttpRequest, HttpResponse, HttpTransport, OrgTransport, RetryPolicy};
pub use config::{BridgeConfig, BridgeConfigBuilder, Credentials};
pub use dispatcher::Dispatcher;
pub use error::{BridgeError, BridgeResult, ErrorCategory};
pub use fields::{FieldSpec, FieldType, ModelField, ModelFieldType};
pub use mapper::{ErrorDescriptor, ToolResult};
pub use registry::{ToolDescriptor, ToolRegistry, ToolSummary};
pub use session::{Authenticator, Session, SessionGrant, SessionManager};
pub use validator::{validate, ValidatedParams};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
