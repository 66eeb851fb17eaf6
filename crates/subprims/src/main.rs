mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "subprims", version, about = "Typed pub/sub consumer toolkit")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validate_with_properties() {
        let cli = Cli::try_parse_from([
            "subprims",
            "validate",
            "message.json",
            "--schemas",
            "/tmp/schemas",
            "--property",
            "tenant=acme",
            "--property",
            "region=eu",
        ])
        .expect("validate args should parse");

        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.properties.len(), 2);
                assert_eq!(args.properties[0], ("tenant".to_string(), "acme".to_string()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_property() {
        let err = Cli::try_parse_from([
            "subprims",
            "validate",
            "message.json",
            "--schemas",
            "/tmp/schemas",
            "--property",
            "no-separator",
        ])
        .expect_err("property without '=' should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_replay_with_decline_and_fail() {
        let cli = Cli::try_parse_from([
            "subprims",
            "--format",
            "json",
            "replay",
            "stream.ndjson",
            "--schemas",
            "/tmp/schemas",
            "--decline",
            "user.created",
            "--fail",
            "job.run",
        ])
        .expect("replay args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        match cli.command {
            Command::Replay(args) => {
                assert_eq!(args.decline, vec!["user.created".to_string()]);
                assert_eq!(args.fail, vec!["job.run".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
