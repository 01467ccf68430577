//! Operation translators
//!
//! One translator per tool family. Each turns validated parameters into
//! backend calls and reshapes the responses into a stable result type.
//!
//! - [`object`] - custom object and field creation (Tooling API)
//! - [`query`] - SOQL with pagination, SOSL grouping
//! - [`schema`] - object describe reshaping
//! - [`einstein`] - Einstein Studio model definitions

pub mod einstein;
pub mod object;
pub mod query;
pub mod schema;

pub use einstein::{EinsteinModelRequest, EinsteinTranslator, ModelSubmission};
pub use object::{ObjectCreationReport, ObjectCreationRequest, ObjectTranslator};
pub use query::{QueryRecords, QueryRequest, QueryTranslator, SearchGroups};
pub use schema::{ObjectDescription, ObjectFields, SchemaTranslator};

use crate::error::{BridgeError, BridgeResult};

/// `{data_path}/sobjects/{name}/describe`
pub(crate) fn describe_path(data_path: &str, object_name: &str) -> String {
    format!("{}/sobjects/{}/describe", data_path, urlencoding::encode(object_name))
}

/// `{data_path}/tooling/sobjects/{kind}`
pub(crate) fn tooling_path(data_path: &str, kind: &str) -> String {
    format!("{}/tooling/sobjects/{}", data_path, kind)
}

/// Object names are letters, digits and underscores (`Account`,
/// `ns__Invoice__c`, `Lead_Training__dlm`)
pub(crate) fn check_object_name(name: &str, path: &str) -> BridgeResult<()> {
    let valid = name.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BridgeError::validation(
            path,
            format!("'{name}' is not a valid object API name"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_check() {
        assert!(check_object_name("Account", "object_name").is_ok());
        assert!(check_object_name("ns__Invoice__c", "object_name").is_ok());
        assert!(check_object_name("Account/../x", "object_name").is_err());
        assert!(check_object_name("1Account", "object_name").is_err());
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            describe_path("/services/data/v59.0", "Account"),
            "/services/data/v59.0/sobjects/Account/describe"
        );
        assert_eq!(
            tooling_path("/services/data/v59.0", "CustomField"),
            "/services/data/v59.0/tooling/sobjects/CustomField"
        );
    }
}
