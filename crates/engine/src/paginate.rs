//! Continuation-token pagination.
//!
//! Pages are delivered to a sink as soon as they are projected. A failure on
//! any page ends the loop; pages already delivered stand.

use rekog_types::{OperationRequest, PaginationSpec, RequestValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::EngineError;
use crate::invoke::Invoker;

/// Output of an invocation, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// One projected response.
    Page(Value),
    /// Token for the next page, handed back in caller-controlled mode.
    ContinuationToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    /// Follow continuation tokens until the service stops returning one.
    Automatic,
    /// Fetch one page and hand the next token back.
    Manual,
    /// Fetch one page and hand back only the raw token, unprojected.
    TokenOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub pages: usize,
    pub next_token: Option<String>,
}

/// Drives paginated calls of one operation.
pub struct Paginator<'a> {
    invoker: &'a Invoker,
    pagination: &'a PaginationSpec,
    /// Request member that carries the input token.
    token_member: &'a str,
    mode: PaginationMode,
    cancel: CancellationToken,
}

impl<'a> Paginator<'a> {
    pub fn new(invoker: &'a Invoker, pagination: &'a PaginationSpec, token_member: &'a str, mode: PaginationMode) -> Self {
        Self {
            invoker,
            pagination,
            token_member,
            mode,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the loop starting from `request`, which already carries any
    /// caller-supplied starting token.
    pub async fn run<P, S>(&self, request: OperationRequest, project: P, mut sink: S) -> Result<PageSummary, EngineError>
    where
        P: Fn(&Value) -> Value,
        S: FnMut(PageEvent),
    {
        let mut summary = PageSummary::default();
        let mut next_request = Some(request.clone());

        while let Some(page_request) = next_request.take() {
            if self.cancel.is_cancelled() {
                info!(pages = summary.pages, "pagination cancelled");
                return Err(EngineError::Cancelled);
            }

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(pages = summary.pages, "pagination cancelled during call");
                    return Err(EngineError::Cancelled);
                }
                result = self.invoker.invoke(page_request) => result?,
            };
            summary.pages += 1;

            let token = next_token(&response, &self.pagination.output_token);
            debug!(page = summary.pages, has_next = token.is_some(), "page received");

            if self.mode != PaginationMode::TokenOnly {
                sink(PageEvent::Page(project(&response)));
            }

            match self.mode {
                PaginationMode::Automatic => {
                    if let Some(token) = token {
                        next_request = Some(request.with_member(self.token_member, RequestValue::Scalar(Value::String(token))));
                    }
                }
                PaginationMode::Manual | PaginationMode::TokenOnly => {
                    if let Some(token) = &token {
                        sink(PageEvent::ContinuationToken(token.clone()));
                    }
                    summary.next_token = token;
                }
            }
        }

        Ok(summary)
    }
}

/// Non-empty string token in `field` of `response`.
fn next_token(response: &Value, field: &str) -> Option<String> {
    response
        .get(field)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
