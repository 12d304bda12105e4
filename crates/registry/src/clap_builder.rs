use clap::{Arg, ArgAction, Command as ClapCommand};
use heck::ToKebabCase;
use rekog_types::{OperationSpec, ParamSpec, ParamType};

use crate::OperationRegistry;

/// Builds the complete clap command tree from the registry's operations.
///
/// Every operation becomes a subcommand named after its `command`, and every
/// parameter a long flag whose id is the parameter name. Global flags control
/// output selection, confirmation, pagination and connection settings.
///
/// # Examples
///
/// ```rust
/// use rekog_registry::{OperationRegistry, build_clap};
///
/// let registry = OperationRegistry::from_embedded_catalog().unwrap();
/// let matches = build_clap(&registry)
///     .try_get_matches_from(["rekog", "describe-collection", "--collection-id", "faces"])
///     .unwrap();
/// assert_eq!(matches.subcommand_name(), Some("describe-collection"));
/// ```
pub fn build_clap(registry: &OperationRegistry) -> ClapCommand {
    let mut root = create_root_command()
        .subcommand(ClapCommand::new("operations").about("List the operations in the catalog"))
        .subcommand(build_config_command());

    for operation in &registry.operations {
        root = root.subcommand(build_subcommand(operation));
    }

    root
}

/// CLI flag name of a parameter (`ImageBucket` → `image-bucket`).
pub fn flag_name(name: &str) -> String {
    name.to_kebab_case()
}

/// Clap requires `'static` names; the tree is built once per process.
fn leak(text: String) -> &'static str {
    Box::leak(text.into_boxed_str())
}

fn create_root_command() -> ClapCommand {
    ClapCommand::new("rekog")
        .about("Amazon Rekognition from the command line")
        .subcommand_required(true)
        .arg(
            Arg::new("select")
                .long("select")
                .short('s')
                .global(true)
                .action(ArgAction::Set)
                .value_name("SELECTOR")
                .help("Output selector: '*' for the whole response, a response field name, or '^Param' to echo a parameter"),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Skip the confirmation prompt for operations that change state"),
        )
        .arg(
            Arg::new("no-auto-iteration")
                .long("no-auto-iteration")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Fetch a single page and print the next continuation token"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the assembled request instead of sending it"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .global(true)
                .action(ArgAction::Set)
                .value_parser(["json", "yaml"])
                .default_value("json")
                .help("Output format"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .global(true)
                .action(ArgAction::Set)
                .help("AWS region"),
        )
        .arg(
            Arg::new("endpoint-url")
                .long("endpoint-url")
                .global(true)
                .action(ArgAction::Set)
                .help("Override the service endpoint"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose logging"),
        )
}

fn build_config_command() -> ClapCommand {
    ClapCommand::new("config")
        .about("Show or update the configuration file")
        .subcommand_required(true)
        .subcommand(ClapCommand::new("show").about("Print the effective configuration"))
        .subcommand(
            ClapCommand::new("set")
                .about("Persist --region, --endpoint-url and --timeout-secs to the configuration file")
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}

fn build_subcommand(operation: &OperationSpec) -> ClapCommand {
    let mut subcommand = ClapCommand::new(leak(operation.command.clone())).about(operation.summary.clone());
    if operation.mutating {
        subcommand = subcommand.after_help("Changes service state; asks for confirmation unless --force is given.");
    }
    for param in &operation.params {
        subcommand = subcommand.arg(build_param_argument(param));
    }
    subcommand
}

/// Builds a single flag from a parameter.
///
/// Lists and maps accept repeated flags. Values are kept as text here and
/// converted to typed values when the invocation is bound.
fn build_param_argument(param: &ParamSpec) -> Arg {
    let long = leak(flag_name(&param.name));
    let mut arg = Arg::new(leak(param.name.clone()))
        .long(long)
        .required(param.required)
        .value_name(value_name(param.r#type))
        .help(generate_help_text(param));

    arg = match param.r#type {
        ParamType::StringList | ParamType::StringMap => arg.action(ArgAction::Append).num_args(1..),
        _ => arg.action(ArgAction::Set),
    };

    for alias in &param.aliases {
        let alias_flag = flag_name(alias);
        if alias_flag != long {
            arg = arg.visible_alias(leak(alias_flag));
        }
    }
    arg
}

fn value_name(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::Bytes => "PATH",
        ParamType::StringMap => "KEY=VALUE",
        ParamType::Json => "JSON",
        ParamType::Int32 => "INT",
        ParamType::Float => "NUMBER",
        ParamType::Boolean => "BOOL",
        ParamType::String | ParamType::StringList => "VALUE",
    }
}

fn generate_help_text(param: &ParamSpec) -> String {
    let mut help = param
        .description
        .clone()
        .unwrap_or_else(|| format!("type: {}", param.r#type));
    if param.from_pipeline {
        help.push_str(" Accepts '-' to read from stdin.");
    }
    help
}
