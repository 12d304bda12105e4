//! Transport error taxonomy.

use std::error::Error as StdError;

use rekog_util::JsonParseError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure raised by a [`Transport`](crate::Transport) call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service answered with an error document.
    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        status: Option<u16>,
        #[source]
        cause: Option<BoxError>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] JsonParseError),
    #[error("request signing failed: {0}")]
    Signing(String),
    /// A name-resolution failure, relabelled with the endpoint being reached.
    #[error(
        "Name resolution failure attempting to reach service endpoint '{endpoint}'. \
         The endpoint may not be valid for the selected region, or the service may not be available there."
    )]
    EndpointResolution {
        endpoint: String,
        #[source]
        source: Box<TransportError>,
    },
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn service(code: impl Into<String>, message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
            status,
            cause: None,
        }
    }

    /// Attach an inner cause to a service error; other variants are returned unchanged.
    pub fn with_cause(self, inner: impl Into<BoxError>) -> Self {
        match self {
            Self::Service {
                code, message, status, ..
            } => Self::Service {
                code,
                message,
                status,
                cause: Some(inner.into()),
            },
            other => other,
        }
    }

    /// Service error code, when the failure came from the service.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Marker error for a host name that could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to resolve host '{host}'")]
pub struct NameResolutionError {
    pub host: String,
}

const NAME_RESOLUTION_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host is known",
    "temporary failure in name resolution",
];

/// Whether a name-resolution failure is buried in the inner causes of `error`.
///
/// Only the cause chain is inspected, not the outer error itself.
pub fn is_name_resolution_failure(error: &TransportError) -> bool {
    if matches!(error, TransportError::EndpointResolution { .. }) {
        return false;
    }
    let mut current = error.source();
    while let Some(cause) = current {
        if cause.is::<NameResolutionError>() {
            return true;
        }
        let text = cause.to_string().to_ascii_lowercase();
        if NAME_RESOLUTION_MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        current = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_with_dns_cause_is_detected() {
        let error = TransportError::service("ServiceUnavailable", "unreachable", None).with_cause(NameResolutionError {
            host: "rekognition.moon-1.amazonaws.com".into(),
        });
        assert!(is_name_resolution_failure(&error));
    }

    #[test]
    fn textual_dns_cause_is_detected() {
        let inner: BoxError = "error trying to connect: dns error: failed to lookup address information".into();
        let error = TransportError::service("RequestError", "send failed", None).with_cause(inner);
        assert!(is_name_resolution_failure(&error));
    }

    #[test]
    fn outer_message_alone_is_not_enough() {
        let error = TransportError::service("InvalidParameterException", "dns error in the message only", Some(400));
        assert!(!is_name_resolution_failure(&error));
        assert_eq!(error.code(), Some("InvalidParameterException"));
    }

    #[test]
    fn with_cause_ignores_non_service_errors() {
        let error = TransportError::Other("boom".into()).with_cause(NameResolutionError { host: "x".into() });
        assert!(!is_name_resolution_failure(&error));
    }
}
