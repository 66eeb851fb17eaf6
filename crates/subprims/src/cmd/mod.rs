use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod catalog;
pub mod replay;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one envelope against a schema directory.
    Validate(ValidateArgs),
    /// List the message types in a schema directory.
    Catalog(CatalogArgs),
    /// Replay newline-delimited envelopes through an in-memory subscriber.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Validate(args) => validate::run(args, format),
        Command::Catalog(args) => catalog::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema directory (`<type>.data.schema.json`, `<type>.properties.schema.json`).
    #[arg(long = "schemas", value_name = "DIR", env = "SUBPRIMS_SCHEMA_DIR")]
    pub dir: PathBuf,
    /// Reject undeclared object fields.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Envelope file to check.
    pub file: PathBuf,
    #[command(flatten)]
    pub schemas: SchemaArgs,
    /// Broker property attached to the message (repeatable).
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Schema directory.
    #[arg(value_name = "DIR", env = "SUBPRIMS_SCHEMA_DIR")]
    pub dir: PathBuf,
    /// Reject undeclared object fields.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// File with one envelope per line.
    pub file: PathBuf,
    #[command(flatten)]
    pub schemas: SchemaArgs,
    /// Broker property attached to every message (repeatable).
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
    /// Message type whose handler declines (leaves messages pending).
    #[arg(long, value_name = "TYPE")]
    pub decline: Vec<String>,
    /// Message type whose handler fails (messages are negatively acknowledged).
    #[arg(long, value_name = "TYPE")]
    pub fail: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
