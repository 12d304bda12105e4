use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Request, RequestBuilder, header};
use rekog_types::OperationRequest;
use rekog_util::{parse_json_strict, truncate_for_summary};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{Transport, TransportError};

/// Base domains accepted for non-local endpoint overrides. Subdomains are
/// accepted too.
const ALLOWED_AWS_DOMAINS: &[&str] = &["amazonaws.com", "amazonaws.com.cn", "api.aws"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];
const TARGET_PREFIX: &str = "RekognitionService";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("could not build the HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Settings resolved from configuration before the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub timeout: Duration,
    pub user_agent_suffix: Option<String>,
}

impl ClientSettings {
    pub fn for_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent_suffix: None,
        }
    }

    /// The endpoint override when present, otherwise the regional endpoint.
    pub fn endpoint(&self) -> String {
        self.endpoint_url.clone().unwrap_or_else(|| default_endpoint(&self.region))
    }
}

/// Signs an outgoing HTTP request in place.
///
/// A signer that cannot sign returns [`TransportError::Signing`]; the request
/// is then never sent.
pub trait RequestSigner: Send + Sync + Debug {
    fn sign(&self, request: &mut Request) -> Result<(), TransportError>;
}

/// Leaves requests untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsigned;

impl RequestSigner for Unsigned {
    fn sign(&self, _request: &mut Request) -> Result<(), TransportError> {
        Ok(())
    }
}

/// HTTP client for the Rekognition JSON protocol.
///
/// Every operation is a `POST /` whose `X-Amz-Target` header names the
/// operation and whose body is the request rendered as JSON.
#[derive(Debug, Clone)]
pub struct RekognitionClient {
    endpoint: Url,
    endpoint_text: String,
    http: Client,
    user_agent: String,
    signer: Arc<dyn RequestSigner>,
}

impl RekognitionClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let endpoint = validate_endpoint(&settings.endpoint())?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()?;

        let mut user_agent = format!("rekog/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS);
        if let Some(suffix) = settings.user_agent_suffix.as_deref().filter(|s| !s.trim().is_empty()) {
            user_agent.push(' ');
            user_agent.push_str(suffix.trim());
        }

        Ok(Self {
            endpoint_text: endpoint.as_str().trim_end_matches('/').to_string(),
            endpoint,
            http,
            user_agent,
            signer: Arc::new(Unsigned),
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Build the HTTP request for `operation` without a body.
    pub fn request(&self, operation: &str) -> RequestBuilder {
        debug!(url = %self.endpoint, operation, "building request");
        self.http
            .post(self.endpoint.clone())
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("X-Amz-Target", target_header(operation))
    }

    /// The signed HTTP request that [`Transport::call`] would send.
    pub fn build_http_request(&self, request: &OperationRequest) -> Result<Request, TransportError> {
        let mut http_request = self
            .request(request.operation())
            .json(&request.to_wire_json())
            .build()?;
        self.signer.sign(&mut http_request)?;
        Ok(http_request)
    }
}

/// `X-Amz-Target` value for an operation.
pub fn target_header(operation: &str) -> String {
    format!("{TARGET_PREFIX}.{operation}")
}

#[async_trait]
impl Transport for RekognitionClient {
    fn endpoint(&self) -> &str {
        &self.endpoint_text
    }

    async fn call(&self, request: &OperationRequest) -> Result<Value, TransportError> {
        let start = Instant::now();
        let operation = request.operation();
        let http_request = self.build_http_request(request)?;

        let response = self.http.execute(http_request).await?;
        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            let error = service_error(status.as_u16(), &body_text);
            warn!(
                operation,
                status = %status,
                code = error.code().unwrap_or("unknown"),
                duration_ms = start.elapsed().as_millis() as u64,
                "rekognition request failed"
            );
            return Err(error);
        }

        let parsed = parse_json_strict(&body_text, Some(status.as_u16()))?;
        debug!(
            operation,
            status = %status,
            duration_ms = start.elapsed().as_millis() as u64,
            "rekognition request completed"
        );
        Ok(parsed)
    }
}

/// Decode an AWS JSON error document (`__type` plus `message`/`Message`).
fn service_error(status: u16, body_text: &str) -> TransportError {
    let document = serde_json::from_str::<Value>(body_text).unwrap_or(Value::Null);
    let code = document
        .get("__type")
        .and_then(Value::as_str)
        .map(|raw| raw.rsplit('#').next().unwrap_or(raw).to_string())
        .unwrap_or_else(|| format!("Http{status}"));
    let message = document
        .get("message")
        .or_else(|| document.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_for_summary(body_text, 160));
    TransportError::service(code, message, Some(status))
}

/// Regional Rekognition endpoint.
pub fn default_endpoint(region: &str) -> String {
    if region.starts_with("cn-") {
        format!("https://rekognition.{region}.amazonaws.com.cn")
    } else {
        format!("https://rekognition.{region}.amazonaws.com")
    }
}

/// Validate that an endpoint is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be one of the allowed AWS
///   domains or a subdomain thereof
pub fn validate_endpoint(endpoint: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let parsed = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    let host_name = parsed.host_str().ok_or_else(|| invalid("endpoint must include a host".into()))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(parsed);
    }

    if parsed.scheme() != "https" {
        return Err(invalid(format!(
            "non-local endpoints must use https; got '{}://'",
            parsed.scheme()
        )));
    }

    let is_allowed_domain = ALLOWED_AWS_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.to_ascii_lowercase().ends_with(&format!(".{allowed_domain}"))
    });
    if !is_allowed_domain {
        return Err(invalid(format!(
            "host '{host_name}' must be one of {ALLOWED_AWS_DOMAINS:?} or a subdomain, or localhost"
        )));
    }

    Ok(parsed)
}
