mod bind;
mod output;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use dialoguer::Confirm;
use rekog_api::{RekognitionClient, Transport};
use rekog_engine::{ConfirmationGate, EngineError, Invoker, OperationRunner, Outcome, RunOptions};
use rekog_registry::{OperationRegistry, RekogConfig, build_clap};
use rekog_types::{OperationSpec, OperationRequest};
use rekog_util::{redact_json, redact_sensitive};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::bind::{Pipeline, collect_bindings};
use crate::output::{EventWriter, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let registry = OperationRegistry::from_embedded_catalog().context("failed to load the operation catalog")?;
    let matches = build_clap(&registry).get_matches();

    let (command, sub_matches) = matches.subcommand().context("expected a command")?;
    init_tracing(sub_matches.get_flag("verbose"));

    match command {
        "operations" => list_operations(&registry, sub_matches),
        "config" => run_config_command(sub_matches),
        _ => run_operation(&registry, command, sub_matches).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn output_format(matches: &ArgMatches) -> Result<OutputFormat> {
    OutputFormat::parse(matches.get_one::<String>("output").map_or("json", String::as_str))
}

/// Configuration file, then environment, then `--region`/`--endpoint-url`.
fn effective_config(matches: &ArgMatches) -> Result<RekogConfig> {
    let mut config = RekogConfig::load().context("failed to load configuration")?.with_env_overrides();
    if let Some(region) = matches.get_one::<String>("region") {
        config.region = Some(region.clone());
    }
    if let Some(endpoint) = matches.get_one::<String>("endpoint-url") {
        config.endpoint_url = Some(endpoint.clone());
    }
    Ok(config)
}

fn list_operations(registry: &OperationRegistry, matches: &ArgMatches) -> Result<()> {
    let operations: Vec<Value> = registry
        .operations
        .iter()
        .map(|operation| {
            json!({
                "command": operation.command,
                "operation": operation.name,
                "summary": operation.summary,
                "paginated": operation.is_paginated(),
                "mutating": operation.mutating,
            })
        })
        .collect();
    let mut writer = EventWriter::new(io::stdout().lock(), output_format(matches)?);
    writer.write_value(&Value::Array(operations))
}

fn run_config_command(matches: &ArgMatches) -> Result<()> {
    let (action, action_matches) = matches.subcommand().context("expected 'show' or 'set'")?;
    match action {
        "show" => {
            let config = effective_config(action_matches)?;
            let settings = config.client_settings();
            let shown = json!({
                "path": rekog_registry::config::default_config_path().display().to_string(),
                "region": settings.region,
                "endpoint": settings.endpoint(),
                "timeout_secs": settings.timeout.as_secs(),
                "user_agent_suffix": settings.user_agent_suffix,
            });
            let mut writer = EventWriter::new(io::stdout().lock(), output_format(action_matches)?);
            writer.write_value(&shown)
        }
        "set" => {
            let mut config = RekogConfig::load().context("failed to load configuration")?;
            let mut changed = false;
            if let Some(region) = action_matches.get_one::<String>("region") {
                config.region = Some(region.clone());
                changed = true;
            }
            if let Some(endpoint) = action_matches.get_one::<String>("endpoint-url") {
                rekog_api::validate_endpoint(endpoint)?;
                config.endpoint_url = Some(endpoint.clone());
                changed = true;
            }
            if let Some(timeout) = action_matches.get_one::<u64>("timeout-secs") {
                config.timeout_secs = Some(*timeout);
                changed = true;
            }
            if !changed {
                bail!("nothing to set; pass --region, --endpoint-url or --timeout-secs");
            }
            let path = config.save().context("failed to save configuration")?;
            eprintln!("Saved {}", path.display());
            Ok(())
        }
        other => Err(anyhow!("unknown config action '{other}'")),
    }
}

/// Confirmation through an interactive prompt. Without a terminal the
/// operation is declined.
struct PromptConfirmation;

impl ConfirmationGate for PromptConfirmation {
    fn confirm(&self, operation: &OperationSpec, target: Option<&str>) -> bool {
        if !io::stdin().is_terminal() {
            warn!(operation = %operation.name, "no terminal to confirm on; pass --force to proceed");
            return false;
        }
        let prompt = match target {
            Some(target) => format!("Perform {} on \"{}\"?", operation.name, target),
            None => format!("Perform {}?", operation.name),
        };
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

async fn run_operation(registry: &OperationRegistry, command: &str, matches: &ArgMatches) -> Result<()> {
    let operation = registry.find(command)?;
    let format = output_format(matches)?;
    let config = effective_config(matches)?;
    let settings = config.client_settings();

    let bindings = collect_bindings(operation, matches, &mut Pipeline::new(io::stdin().lock()))?;
    let options = RunOptions {
        select: matches.get_one::<String>("select").cloned(),
        force: matches.get_flag("force"),
        no_auto_iteration: matches.get_flag("no-auto-iteration"),
        ..RunOptions::default()
    };

    let factory_settings = settings.clone();
    let invoker = Invoker::with_factory(move || {
        let client = RekognitionClient::new(&factory_settings)?;
        Ok(Arc::new(client) as Arc<dyn Transport>)
    });
    let runner = OperationRunner::new(invoker).with_confirmation(PromptConfirmation);

    if matches.get_flag("dry-run") {
        let prepared = runner.prepare(operation, bindings, &options)?;
        let client = RekognitionClient::new(&settings).context("invalid client settings")?;
        let preview = dry_run_preview(&client, &prepared.request)?;
        let mut writer = EventWriter::new(io::stdout().lock(), format);
        return writer.write_value(&preview);
    }

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received; cancelling");
            on_interrupt.cancel();
        }
    });
    let options = RunOptions { cancellation, ..options };

    let mut writer = EventWriter::new(io::stdout().lock(), format);
    let mut write_error = None;
    let result = runner
        .run(operation, bindings, options, |event| {
            if write_error.is_none()
                && let Err(error) = writer.write_event(event)
            {
                write_error = Some(error);
            }
        })
        .await;
    if let Some(error) = write_error {
        return Err(error.context("failed to write output"));
    }

    match result {
        Ok(report) => {
            if report.outcome == Outcome::Declined {
                eprintln!("{} was not confirmed; nothing was sent", operation.name);
            }
            if let Some(token) = report.next_token {
                debug!(next_token = %token, "more results available");
            }
            Ok(())
        }
        Err(EngineError::Cancelled) => bail!("{} cancelled", operation.name),
        Err(error) => Err(anyhow!(error).context(format!("{} failed", operation.name))),
    }
}

/// What `--dry-run` prints: the HTTP request that would be sent, with
/// credentials redacted and payloads summarized.
fn dry_run_preview(client: &RekognitionClient, request: &OperationRequest) -> Result<Value> {
    let http_request = client.build_http_request(request)?;
    let mut headers = serde_json::Map::new();
    for (name, value) in http_request.headers() {
        let line = format!("{}: {}", name.as_str(), value.to_str().unwrap_or_default());
        let redacted = redact_sensitive(&line);
        let shown = redacted.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or_default();
        headers.insert(name.as_str().to_string(), Value::String(shown.to_string()));
    }
    Ok(json!({
        "method": http_request.method().as_str(),
        "url": http_request.url().as_str(),
        "headers": headers,
        "body": redact_json(&request.to_preview_json()),
    }))
}
