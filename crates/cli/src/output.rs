use std::io::Write;

use anyhow::{Result, bail};
use rekog_engine::PageEvent;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(text: &str) -> Result<Self> {
        match text.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => bail!("unsupported output format '{other}'"),
        }
    }

    pub fn render(self, value: &Value) -> Result<String> {
        let rendered = match self {
            Self::Json => serde_json::to_string_pretty(value)?,
            Self::Yaml => serde_yaml::to_string(value)?,
        };
        Ok(rendered.trim_end().to_string())
    }
}

/// Writes each event as one document; YAML documents are separated by `---`.
pub struct EventWriter<W> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> EventWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn write_event(&mut self, event: PageEvent) -> Result<()> {
        let value = match event {
            PageEvent::Page(value) => value,
            PageEvent::ContinuationToken(token) => Value::String(token),
        };
        self.write_value(&value)
    }

    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        if self.format == OutputFormat::Yaml && self.written > 0 {
            writeln!(self.out, "---")?;
        }
        writeln!(self.out, "{}", self.format.render(value)?)?;
        self.written += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
