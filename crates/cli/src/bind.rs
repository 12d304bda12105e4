//! Conversion of parsed command-line values into parameter bindings.

use std::fs;
use std::io::Read;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use indexmap::IndexMap;
use rekog_types::{OperationSpec, ParamSpec, ParamType, ParamValue};
use rekog_util::expand_tilde;

/// Marker value that reads a parameter from standard input.
const STDIN_MARKER: &str = "-";

/// Standard input, readable by at most one parameter per invocation.
pub struct Pipeline<R> {
    reader: R,
    consumed_by: Option<String>,
}

impl<R: Read> Pipeline<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            consumed_by: None,
        }
    }

    fn take(&mut self, param: &str) -> Result<Vec<u8>> {
        if let Some(previous) = &self.consumed_by {
            bail!("standard input was already read for '{previous}'; '{param}' cannot read it too");
        }
        self.consumed_by = Some(param.to_string());
        let mut buffer = Vec::new();
        self.reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("failed to read '{param}' from standard input"))?;
        Ok(buffer)
    }

    fn take_text(&mut self, param: &str) -> Result<String> {
        let bytes = self.take(param)?;
        String::from_utf8(bytes).with_context(|| format!("standard input for '{param}' is not valid UTF-8"))
    }
}

/// Bindings for every parameter given on the command line.
///
/// An empty value binds the parameter to null, or to an empty collection for
/// list and map parameters. `-` reads a pipeline
/// parameter, or the bytes of a `bytes` parameter, from standard input.
pub fn collect_bindings<R: Read>(
    operation: &OperationSpec,
    matches: &ArgMatches,
    pipeline: &mut Pipeline<R>,
) -> Result<Vec<(String, Option<ParamValue>)>> {
    let mut bindings = Vec::new();
    for param in &operation.params {
        let Some(raw_values) = matches.get_many::<String>(&param.name) else {
            continue;
        };
        let raw_values: Vec<&str> = raw_values.map(String::as_str).collect();
        let value = bind_param(param, &raw_values, pipeline)?;
        bindings.push((param.name.clone(), value));
    }
    Ok(bindings)
}

fn bind_param<R: Read>(param: &ParamSpec, raw_values: &[&str], pipeline: &mut Pipeline<R>) -> Result<Option<ParamValue>> {
    if raw_values.iter().all(|raw| raw.is_empty()) {
        return Ok(match param.r#type {
            ParamType::StringList => Some(ParamValue::StringList(Vec::new())),
            ParamType::StringMap => Some(ParamValue::StringMap(IndexMap::new())),
            _ => None,
        });
    }

    let reads_stdin = raw_values == [STDIN_MARKER];
    if param.r#type == ParamType::Bytes {
        let bytes = match raw_values.last() {
            Some(&STDIN_MARKER) => pipeline.take(&param.name)?,
            Some(path) => {
                let path = expand_tilde(path);
                fs::read(&path).with_context(|| format!("failed to read '{}' for '{}'", path.display(), param.name))?
            }
            None => return Ok(None),
        };
        return Ok(Some(ParamValue::Bytes(bytes)));
    }

    if reads_stdin && param.from_pipeline {
        let text = pipeline.take_text(&param.name)?;
        let entries: Vec<&str> = match param.r#type {
            ParamType::StringList | ParamType::StringMap => {
                text.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
            }
            _ => vec![text.trim()],
        };
        return parse_entries(param, &entries).map(Some);
    }

    parse_entries(param, raw_values).map(Some)
}

fn parse_entries(param: &ParamSpec, entries: &[&str]) -> Result<ParamValue> {
    ParamValue::from_entries(param.r#type, entries.iter().copied())
        .with_context(|| format!("invalid value for --{}", rekog_registry::flag_name(&param.name)))
}
