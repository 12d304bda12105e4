//! Per-invocation parameter bindings.
//!
//! An [`InvocationContext`] is created for one call of one operation. Each
//! parameter may be bound at most once, either to a value or to null (bound
//! but absent). Aliases resolve to the canonical parameter name.

use std::fmt;

use indexmap::IndexMap;
use rekog_types::{OperationSpec, ParamSpec, ParamType, ParamValue};
use serde_json::Value;
use thiserror::Error;

use crate::select::Selector;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("operation '{operation}' has no parameter named '{name}'")]
    UnknownParameter { operation: String, name: String },
    #[error("parameter '{0}' is already bound")]
    AlreadyBound(String),
    #[error("parameter '{name}' expects a {expected} value, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        actual: ParamType,
    },
}

/// A required parameter that was bound without a value.
///
/// Reported to the caller, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredParamWarning {
    pub operation: String,
    pub param: String,
}

impl fmt::Display for RequiredParamWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: required parameter '{}' was given no value; sending the request without it",
            self.operation, self.param
        )
    }
}

/// Resolved inputs of one operation call.
#[derive(Debug, Clone)]
pub struct InvocationContext<'a> {
    operation: &'a OperationSpec,
    bindings: IndexMap<String, Option<ParamValue>>,
    selector: Selector,
}

impl<'a> InvocationContext<'a> {
    /// Empty context for `operation`, projecting the whole response.
    pub fn new(operation: &'a OperationSpec) -> Self {
        Self {
            operation,
            bindings: IndexMap::new(),
            selector: Selector::WholeResponse,
        }
    }

    pub fn operation(&self) -> &'a OperationSpec {
        self.operation
    }

    /// Bind `name` (or one of its aliases) to `value`; `None` binds null.
    pub fn bind(&mut self, name: &str, value: Option<ParamValue>) -> Result<(), ContextError> {
        let param = self.lookup(name)?;
        if self.bindings.contains_key(&param.name) {
            return Err(ContextError::AlreadyBound(param.name.clone()));
        }
        if let Some(value) = &value
            && value.param_type() != param.r#type
        {
            return Err(ContextError::TypeMismatch {
                name: param.name.clone(),
                expected: param.r#type,
                actual: value.param_type(),
            });
        }
        self.bindings.insert(param.name.clone(), value);
        Ok(())
    }

    /// Bind every `(name, value)` pair in order, stopping at the first error.
    pub fn bind_all<I>(&mut self, bindings: I) -> Result<(), ContextError>
    where
        I: IntoIterator<Item = (String, Option<ParamValue>)>,
    {
        for (name, value) in bindings {
            self.bind(&name, value)?;
        }
        Ok(())
    }

    /// Whether `name` was bound, including to null.
    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_ok_and(|param| self.bindings.contains_key(&param.name))
    }

    /// Value bound to `name`, if bound and not null.
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        let param = self.lookup(name).ok()?;
        self.bindings.get(&param.name).and_then(Option::as_ref)
    }

    /// Bound parameters in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// JSON rendering of the value bound to `name`; null when unbound.
    pub fn echo(&self, name: &str) -> Value {
        self.value(name).map(ParamValue::to_json).unwrap_or(Value::Null)
    }

    /// Required parameters that were bound to null.
    pub fn missing_required(&self) -> Vec<RequiredParamWarning> {
        self.operation
            .params
            .iter()
            .filter(|param| param.required && matches!(self.bindings.get(&param.name), Some(None)))
            .map(|param| RequiredParamWarning {
                operation: self.operation.name.clone(),
                param: param.name.clone(),
            })
            .collect()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn set_selector(&mut self, selector: Selector) {
        self.selector = selector;
    }

    fn lookup(&self, name: &str) -> Result<&'a ParamSpec, ContextError> {
        self.operation.param(name).ok_or_else(|| ContextError::UnknownParameter {
            operation: self.operation.name.clone(),
            name: name.to_string(),
        })
    }
}
