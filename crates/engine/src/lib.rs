//! # Rekog Engine
//!
//! The engine turns bound parameters into Rekognition calls. One invocation
//! of one operation flows through these stages:
//!
//! - **`context`**: write-once parameter bindings and required-parameter warnings
//! - **`select`**: resolution of the output selector before anything is sent
//! - **`assemble`**: the request tree, where groups without leaves are absent
//! - **`invoke`**: one transport call, with name-resolution failures relabelled
//! - **`paginate`**: the continuation-token loop for list operations
//!
//! [`OperationRunner`] ties the stages together and adds the confirmation gate
//! for operations that change service state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rekog_engine::{Invoker, OperationRunner, RunOptions};
//!
//! let runner = OperationRunner::new(Invoker::new(transport));
//! let report = runner
//!     .run(&operation, bindings, RunOptions::default(), |event| println!("{event:?}"))
//!     .await?;
//! for warning in &report.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod assemble;
pub mod context;
pub mod error;
pub mod invoke;
pub mod paginate;
pub mod select;

#[cfg(test)]
mod test_support;

pub use assemble::assemble;
pub use context::{ContextError, InvocationContext, RequiredParamWarning};
pub use error::EngineError;
pub use invoke::{Invoker, TransportFactory};
pub use paginate::{PageEvent, PageSummary, PaginationMode, Paginator};
pub use select::{CustomProjection, Selector, SelectorError};

use rekog_types::{OperationRequest, OperationSpec, ParamValue, PayloadLedger};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Asks the caller whether a state-changing operation may proceed.
pub trait ConfirmationGate: Send + Sync {
    /// `target` is the value of the operation's pipeline parameter, when bound.
    fn confirm(&self, operation: &OperationSpec, target: Option<&str>) -> bool;
}

/// Gate that approves everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl ConfirmationGate for AutoApprove {
    fn confirm(&self, _operation: &OperationSpec, _target: Option<&str>) -> bool {
        true
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Selector text; the operation's default applies when `None`.
    pub select: Option<String>,
    /// Selector built by the caller; takes precedence over `select`.
    pub custom_selector: Option<Selector>,
    /// Skip the confirmation gate.
    pub force: bool,
    /// Fetch a single page and hand the continuation token back.
    pub no_auto_iteration: bool,
    pub cancellation: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The service was called and every page delivered.
    Completed,
    /// The caller declined confirmation; nothing was sent.
    Declined,
    /// The selector echoed an input parameter; nothing was sent.
    Echoed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationReport {
    pub outcome: Outcome,
    pub warnings: Vec<RequiredParamWarning>,
    pub pages: usize,
    pub next_token: Option<String>,
}

impl InvocationReport {
    fn without_call(outcome: Outcome, warnings: Vec<RequiredParamWarning>) -> Self {
        Self {
            outcome,
            warnings,
            pages: 0,
            next_token: None,
        }
    }
}

/// A bound, validated invocation whose request has not been sent.
#[derive(Debug)]
pub struct PreparedInvocation<'a> {
    pub context: InvocationContext<'a>,
    pub request: OperationRequest,
    pub warnings: Vec<RequiredParamWarning>,
}

/// Runs operations end to end.
pub struct OperationRunner {
    invoker: Invoker,
    ledger: PayloadLedger,
    gate: Box<dyn ConfirmationGate>,
}

impl OperationRunner {
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            ledger: PayloadLedger::new(),
            gate: Box::new(AutoApprove),
        }
    }

    pub fn with_confirmation(mut self, gate: impl ConfirmationGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_ledger(mut self, ledger: PayloadLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Ledger counting the payload streams of requests built by this runner.
    pub fn ledger(&self) -> &PayloadLedger {
        &self.ledger
    }

    /// Bind parameters, resolve the selector and assemble the request without
    /// sending it.
    pub fn prepare<'a, I>(
        &self,
        operation: &'a OperationSpec,
        bindings: I,
        options: &RunOptions,
    ) -> Result<PreparedInvocation<'a>, EngineError>
    where
        I: IntoIterator<Item = (String, Option<ParamValue>)>,
    {
        let mut context = bind_context(operation, bindings)?;
        context.set_selector(resolve_selector(operation, options)?);
        let warnings = collect_warnings(&context);
        let request = assemble(&context, &self.ledger);
        Ok(PreparedInvocation {
            context,
            request,
            warnings,
        })
    }

    /// Run one invocation of `operation`, delivering output to `sink`.
    ///
    /// Stages run in order: parameter binding, the confirmation gate for
    /// mutating operations, selector resolution, required-parameter warnings,
    /// the echo short-circuit, then assembly and the call (or page loop).
    pub async fn run<I, S>(
        &self,
        operation: &OperationSpec,
        bindings: I,
        options: RunOptions,
        mut sink: S,
    ) -> Result<InvocationReport, EngineError>
    where
        I: IntoIterator<Item = (String, Option<ParamValue>)>,
        S: FnMut(PageEvent),
    {
        let mut context = bind_context(operation, bindings)?;

        if operation.mutating && !options.force {
            let target = operation
                .pipeline_param()
                .and_then(|param| context.value(&param.name))
                .and_then(|value| match value {
                    ParamValue::String(text) => Some(text.as_str()),
                    _ => None,
                });
            if !self.gate.confirm(operation, target) {
                info!(operation = %operation.name, "operation declined");
                return Ok(InvocationReport::without_call(Outcome::Declined, Vec::new()));
            }
        }

        let selector = resolve_selector(operation, &options)?;
        context.set_selector(selector);
        let warnings = collect_warnings(&context);

        if context.selector().is_echo() {
            let echoed = context.selector().project(&serde_json::Value::Null, &context);
            sink(PageEvent::Page(echoed));
            return Ok(InvocationReport::without_call(Outcome::Echoed, warnings));
        }

        let request = assemble(&context, &self.ledger);
        let summary = match &operation.pagination {
            Some(pagination) => {
                let mode = pagination_mode(operation, &context, &options);
                let token_member = operation
                    .token_param()
                    .map_or(pagination.input_token.as_str(), |param| param.member.as_str());
                let page_size = operation
                    .limit_param()
                    .and_then(|limit| context.value(&limit.name))
                    .map(ParamValue::to_json);
                debug!(operation = %operation.name, ?mode, ?page_size, "paginating");
                let paginator = Paginator::new(&self.invoker, pagination, token_member, mode)
                    .with_cancellation(options.cancellation.clone());
                paginator
                    .run(request, |response| context.selector().project(response, &context), &mut sink)
                    .await?
            }
            None => {
                let response = tokio::select! {
                    biased;
                    _ = options.cancellation.cancelled() => return Err(EngineError::Cancelled),
                    result = self.invoker.invoke(request) => result?,
                };
                sink(PageEvent::Page(context.selector().project(&response, &context)));
                PageSummary {
                    pages: 1,
                    next_token: None,
                }
            }
        };

        Ok(InvocationReport {
            outcome: Outcome::Completed,
            warnings,
            pages: summary.pages,
            next_token: summary.next_token,
        })
    }
}

fn bind_context<I>(operation: &OperationSpec, bindings: I) -> Result<InvocationContext<'_>, EngineError>
where
    I: IntoIterator<Item = (String, Option<ParamValue>)>,
{
    let mut context = InvocationContext::new(operation);
    context.bind_all(bindings)?;
    Ok(context)
}

fn resolve_selector(operation: &OperationSpec, options: &RunOptions) -> Result<Selector, EngineError> {
    match &options.custom_selector {
        Some(selector) => Ok(selector.clone()),
        None => Ok(Selector::resolve(options.select.as_deref(), operation)?),
    }
}

fn collect_warnings(context: &InvocationContext<'_>) -> Vec<RequiredParamWarning> {
    let warnings = context.missing_required();
    for warning in &warnings {
        warn!(operation = %warning.operation, param = %warning.param, "{warning}");
    }
    warnings
}

/// Caller-controlled paging applies when asked for explicitly, when the caller
/// supplied the starting token, or when the selector names the token itself.
fn pagination_mode(operation: &OperationSpec, context: &InvocationContext<'_>, options: &RunOptions) -> PaginationMode {
    if context.selector().names_output_token(operation) {
        return PaginationMode::TokenOnly;
    }
    let caller_token = operation
        .token_param()
        .is_some_and(|param| context.value(&param.name).is_some());
    if options.no_auto_iteration || caller_token {
        PaginationMode::Manual
    } else {
        PaginationMode::Automatic
    }
}
