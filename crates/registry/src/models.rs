use rekog_types::{OperationSpec, ParamType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const EMBEDDED_CATALOG: &str = include_str!("../catalog/rekognition.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("catalog defines '{0}' more than once")]
    Duplicate(String),
    #[error("operation '{operation}': {reason}")]
    Invalid { operation: String, reason: String },
}

/// On-disk shape of a catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    service: String,
    api_version: String,
    operations: Vec<OperationSpec>,
}

/// All operations known to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperationRegistry {
    pub service: String,
    pub api_version: String,
    pub operations: Vec<OperationSpec>,
}

impl OperationRegistry {
    /// Load the catalog compiled into the binary.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rekog_registry::OperationRegistry;
    ///
    /// let registry = OperationRegistry::from_embedded_catalog().expect("load embedded catalog");
    /// assert!(registry.find("index-faces").is_ok());
    /// ```
    pub fn from_embedded_catalog() -> Result<Self, CatalogError> {
        Self::from_catalog_str(EMBEDDED_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_catalog_str(content: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        let registry = Self {
            service: document.service,
            api_version: document.api_version,
            operations: document.operations,
        };
        registry.validate()?;
        debug!(
            service = %registry.service,
            operations = registry.operations.len(),
            "operation catalog loaded"
        );
        Ok(registry)
    }

    /// Find an operation by API name (`IndexFaces`) or command (`index-faces`).
    pub fn find(&self, name: &str) -> Result<&OperationSpec, CatalogError> {
        self.operations
            .iter()
            .find(|operation| operation.command == name || operation.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownOperation(name.to_string()))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut names = std::collections::HashSet::new();
        for operation in &self.operations {
            if !names.insert(operation.name.to_ascii_lowercase()) || !names.insert(operation.command.clone()) {
                return Err(CatalogError::Duplicate(operation.name.clone()));
            }
            validate_operation(operation)?;
        }
        Ok(())
    }
}

fn validate_operation(operation: &OperationSpec) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::Invalid {
        operation: operation.name.clone(),
        reason,
    };

    if operation.default_select != "*" && !operation.has_response_field(&operation.default_select) {
        return Err(invalid(format!(
            "default selector '{}' is not a response field",
            operation.default_select
        )));
    }

    for (index, param) in operation.params.iter().enumerate() {
        if param.member_path().next().is_none() {
            return Err(invalid(format!("parameter '{}' has an empty member path", param.name)));
        }
        for other in &operation.params[index + 1..] {
            if other.answers_to(&param.name) || other.member == param.member {
                return Err(invalid(format!("parameters '{}' and '{}' collide", param.name, other.name)));
            }
            // A leaf cannot also be a group.
            let nested = |outer: &str, inner: &str| inner.starts_with(&format!("{outer}."));
            if nested(&param.member, &other.member) || nested(&other.member, &param.member) {
                return Err(invalid(format!(
                    "members '{}' and '{}' overlap",
                    param.member, other.member
                )));
            }
        }
    }

    if let Some(pagination) = &operation.pagination {
        let token_param = operation
            .token_param()
            .ok_or_else(|| invalid(format!("no parameter fills the input token '{}'", pagination.input_token)))?;
        if token_param.r#type != ParamType::String {
            return Err(invalid("the input token parameter must be a string".into()));
        }
        if !operation.has_response_field(&pagination.output_token) {
            return Err(invalid(format!("output token '{}' is not a response field", pagination.output_token)));
        }
        if let Some(limit) = &pagination.limit_param
            && operation.param(limit).is_none()
        {
            return Err(invalid(format!("limit parameter '{limit}' is not defined")));
        }
    }

    Ok(())
}
