//! Operation descriptors loaded from the embedded catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int32,
    Float,
    Boolean,
    /// Raw byte buffer, sent as a payload stream.
    Bytes,
    /// Ordered list of strings.
    StringList,
    /// String-keyed string map; insertion order is preserved.
    StringMap,
    /// Structured value (object arrays and similar) supplied as JSON.
    Json,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
            Self::StringList => "string_list",
            Self::StringMap => "string_map",
            Self::Json => "json",
        }
    }

    /// Collection-typed members count as present whenever they are bound,
    /// even when empty.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::StringList | Self::StringMap | Self::Json)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter of an operation and the request member it fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name as exposed to callers (e.g. `ImageBucket`).
    pub name: String,
    /// Dotted request member path (e.g. `Image.S3Object.Bucket`).
    pub member: String,
    #[serde(rename = "type")]
    pub r#type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// The value may be supplied through standard input.
    #[serde(default)]
    pub from_pipeline: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl ParamSpec {
    /// Segments of the request member path, outermost first.
    pub fn member_path(&self) -> impl Iterator<Item = &str> {
        self.member.split('.').filter(|segment| !segment.is_empty())
    }

    /// Whether `name` refers to this parameter, by name or alias.
    ///
    /// Matching is ASCII case-insensitive.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Continuation-token wiring of a paginated operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSpec {
    /// Request member carrying the token into the next call.
    pub input_token: String,
    /// Top-level response field holding the next token.
    pub output_token: String,
    /// Parameter bounding the page size, when the operation has one.
    #[serde(default)]
    pub limit_param: Option<String>,
}

fn default_select() -> String {
    "*".to_string()
}

/// Static metadata for one Rekognition API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// API operation name (e.g. `IndexFaces`).
    pub name: String,
    /// CLI subcommand name (e.g. `index-faces`).
    pub command: String,
    pub summary: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Top-level members of the response shape.
    #[serde(default)]
    pub response_fields: Vec<String>,
    /// Selector applied when the caller does not choose one.
    #[serde(default = "default_select")]
    pub default_select: String,
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,
    /// Changes service-side state; callers are asked to confirm.
    #[serde(default)]
    pub mutating: bool,
}

impl OperationSpec {
    /// Look up a parameter by name or alias.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.answers_to(name))
    }

    /// Whether `field` is a top-level member of the response.
    pub fn has_response_field(&self, field: &str) -> bool {
        self.response_fields.iter().any(|candidate| candidate == field)
    }

    pub fn is_paginated(&self) -> bool {
        self.pagination.is_some()
    }

    /// Parameter whose member carries the input continuation token.
    pub fn token_param(&self) -> Option<&ParamSpec> {
        let pagination = self.pagination.as_ref()?;
        self.params.iter().find(|param| param.member == pagination.input_token)
    }

    /// Parameter bounding the page size of a paginated operation.
    pub fn limit_param(&self) -> Option<&ParamSpec> {
        let limit = self.pagination.as_ref()?.limit_param.as_deref()?;
        self.param(limit)
    }

    /// Parameter that may be bound from standard input, if any.
    pub fn pipeline_param(&self) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.from_pipeline)
    }
}
