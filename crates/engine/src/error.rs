use rekog_api::{ClientError, TransportError};
use thiserror::Error;

use crate::context::ContextError;
use crate::select::SelectorError;

/// Failure of a single operation invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error("could not create the Rekognition client: {0}")]
    Client(#[from] ClientError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("operation cancelled")]
    Cancelled,
}
