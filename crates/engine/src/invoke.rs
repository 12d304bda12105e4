//! Single-attempt transport invocation.

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use rekog_api::{ClientError, Transport, TransportError, is_name_resolution_failure};
use rekog_types::OperationRequest;
use serde_json::Value;
use tracing::debug;

use crate::EngineError;

/// Produces the transport on first use.
pub type TransportFactory = Box<dyn Fn() -> Result<Arc<dyn Transport>, ClientError> + Send + Sync>;

/// Issues requests through one transport, created at most once.
pub struct Invoker {
    transport: OnceCell<Arc<dyn Transport>>,
    factory: Option<TransportFactory>,
}

impl Invoker {
    /// Invoker over an existing transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: OnceCell::with_value(transport),
            factory: None,
        }
    }

    /// Invoker that builds its transport lazily; calls that never reach the
    /// network never construct it.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Transport>, ClientError> + Send + Sync + 'static,
    {
        Self {
            transport: OnceCell::new(),
            factory: Some(Box::new(factory)),
        }
    }

    /// The transport, creating it if needed.
    pub fn transport(&self) -> Result<&Arc<dyn Transport>, EngineError> {
        self.transport
            .get_or_try_init(|| match &self.factory {
                Some(factory) => factory().map_err(EngineError::from),
                None => Err(EngineError::Transport(TransportError::Other("no transport configured".into()))),
            })
    }

    /// Send `request` once and return the raw response.
    ///
    /// The request, and every payload stream inside it, is dropped before this
    /// returns, whatever the outcome. A name-resolution failure anywhere in the
    /// error's cause chain is reported as [`TransportError::EndpointResolution`].
    pub async fn invoke(&self, request: OperationRequest) -> Result<Value, EngineError> {
        let transport = self.transport()?;
        let endpoint = transport.endpoint();
        debug!(
            operation = %request.operation(),
            endpoint = %endpoint,
            "invoking '{}' against endpoint '{}'",
            request.operation(),
            endpoint
        );
        let started = Instant::now();
        let result = transport.call(&request).await;
        drop(request);

        match result {
            Ok(response) => {
                debug!(duration_ms = started.elapsed().as_millis() as u64, "call succeeded");
                Ok(response)
            }
            Err(error) => Err(EngineError::Transport(relabel(error, endpoint))),
        }
    }
}

fn relabel(error: TransportError, endpoint: &str) -> TransportError {
    if is_name_resolution_failure(&error) {
        TransportError::EndpointResolution {
            endpoint: endpoint.to_string(),
            source: Box::new(error),
        }
    } else {
        error
    }
}
