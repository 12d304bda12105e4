//! Rekognition transport for the Rekog CLI.
//!
//! This crate provides the one seam through which requests leave the
//! process:
//!
//! - [`Transport`]: the single-method contract every operation goes through
//! - [`RekognitionClient`]: an HTTP implementation speaking the AWS JSON 1.1
//!   protocol against a validated endpoint
//! - [`TransportError`]: the failure taxonomy, plus
//!   [`is_name_resolution_failure`] to spot DNS failures buried in causes
//!
//! Request signing is delegated to a [`RequestSigner`]; the client ships with
//! [`Unsigned`], which suits local endpoints and signing proxies.
//!
//! # Example
//!
//! ```ignore
//! use rekog_api::{ClientSettings, RekognitionClient, Transport};
//!
//! let client = RekognitionClient::new(&ClientSettings::for_region("eu-west-1"))?;
//! let response = client.call(&request).await?;
//! ```

pub mod client;
pub mod error;

pub use client::{ClientError, ClientSettings, RekognitionClient, RequestSigner, Unsigned, default_endpoint, validate_endpoint};
pub use error::{BoxError, NameResolutionError, TransportError, is_name_resolution_failure};

use async_trait::async_trait;
use rekog_types::OperationRequest;
use serde_json::Value;

/// Issues one request to the Rekognition service.
///
/// Implementations make exactly one attempt; retry policy, if any, belongs to
/// the implementation and is invisible to callers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Endpoint the transport talks to, used in diagnostics.
    fn endpoint(&self) -> &str;

    async fn call(&self, request: &OperationRequest) -> Result<Value, TransportError>;
}
