//! Output selectors.
//!
//! A selector maps the raw response of an operation, together with the
//! invocation context, to the value handed back to the caller. Textual
//! selectors are resolved against the operation before anything is sent:
//!
//! - `*` returns the whole response
//! - `FieldName` returns one top-level response member
//! - `^ParamName` echoes the value bound to an input parameter

use std::fmt;
use std::sync::Arc;

use rekog_types::OperationSpec;
use serde_json::Value;
use thiserror::Error;

use crate::context::InvocationContext;

/// Caller-supplied projection of `(response, context)`.
pub type CustomProjection = Arc<dyn Fn(&Value, &InvocationContext<'_>) -> Value + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid selector: the selector is empty")]
    Empty,
    #[error("invalid selector '{selector}': '{operation}' responses have no member named '{selector}'")]
    UnknownField { operation: String, selector: String },
    #[error("invalid selector '^{name}': '{operation}' has no parameter named '{name}'")]
    UnknownParameter { operation: String, name: String },
}

#[derive(Clone)]
pub enum Selector {
    WholeResponse,
    NamedField(String),
    EchoInput(String),
    Custom(CustomProjection),
}

impl Selector {
    /// Resolve `text` against `operation`.
    ///
    /// Field and parameter names match case-insensitively and resolve to their
    /// canonical spelling.
    pub fn parse(text: &str, operation: &OperationSpec) -> Result<Self, SelectorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SelectorError::Empty);
        }
        if text == "*" {
            return Ok(Self::WholeResponse);
        }
        if let Some(name) = text.strip_prefix('^') {
            let param = operation.param(name.trim()).ok_or_else(|| SelectorError::UnknownParameter {
                operation: operation.name.clone(),
                name: name.trim().to_string(),
            })?;
            return Ok(Self::EchoInput(param.name.clone()));
        }
        operation
            .response_fields
            .iter()
            .find(|field| field.eq_ignore_ascii_case(text))
            .map(|field| Self::NamedField(field.clone()))
            .ok_or_else(|| SelectorError::UnknownField {
                operation: operation.name.clone(),
                selector: text.to_string(),
            })
    }

    /// The operation's default selector.
    pub fn default_for(operation: &OperationSpec) -> Result<Self, SelectorError> {
        Self::parse(&operation.default_select, operation)
    }

    /// Resolve an optional caller choice, falling back to the default.
    pub fn resolve(text: Option<&str>, operation: &OperationSpec) -> Result<Self, SelectorError> {
        match text {
            Some(text) => Self::parse(text, operation),
            None => Self::default_for(operation),
        }
    }

    pub fn custom<F>(projection: F) -> Self
    where
        F: Fn(&Value, &InvocationContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(projection))
    }

    pub fn project(&self, response: &Value, context: &InvocationContext<'_>) -> Value {
        match self {
            Self::WholeResponse => response.clone(),
            Self::NamedField(field) => response.get(field).cloned().unwrap_or(Value::Null),
            Self::EchoInput(name) => context.echo(name),
            Self::Custom(projection) => projection(response, context),
        }
    }

    pub fn is_echo(&self) -> bool {
        matches!(self, Self::EchoInput(_))
    }

    /// Whether the selector asks for the raw continuation token of `operation`.
    pub fn names_output_token(&self, operation: &OperationSpec) -> bool {
        match (self, &operation.pagination) {
            (Self::NamedField(field), Some(pagination)) => field == &pagination.output_token,
            _ => false,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeResponse => f.write_str("WholeResponse"),
            Self::NamedField(field) => f.debug_tuple("NamedField").field(field).finish(),
            Self::EchoInput(name) => f.debug_tuple("EchoInput").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeResponse => f.write_str("*"),
            Self::NamedField(field) => f.write_str(field),
            Self::EchoInput(name) => write!(f, "^{name}"),
            Self::Custom(_) => f.write_str("<custom>"),
        }
    }
}
