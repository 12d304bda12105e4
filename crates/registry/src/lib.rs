//! Registry crate for the Rekognition operations exposed by the Rekog CLI.
//!
//! This crate loads the embedded operation catalog, resolves the user's
//! configuration file, and generates the clap command tree from the catalog.

pub mod clap_builder;
pub mod config;
pub mod models;

pub use clap_builder::{build_clap, flag_name};
pub use config::{ConfigError, RekogConfig};
pub use models::{CatalogError, OperationRegistry};
pub use rekog_types::{OperationSpec, ParamSpec, ParamType};
