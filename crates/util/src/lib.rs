//! Small helpers shared by the Rekog crates: secret redaction, config path
//! resolution, strict JSON parsing of response bodies and text truncation.

pub mod json;
pub mod paths;
pub mod redact;
pub mod text;

pub use json::{JsonParseError, parse_json_strict};
pub use paths::{expand_tilde, resolve_config_path};
pub use redact::{redact_json, redact_sensitive};
pub use text::truncate_for_summary;
