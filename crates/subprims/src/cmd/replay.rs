use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use subprims_broker::{Disposition, MemoryBroker, RawProperties, SubscriptionConfig};
use subprims_consumer::{handler_fn, HandlerError, Router, Subscriber};
use subprims_envelope::PropertyMap;
use subprims_schema::SchemaCatalog;

use crate::cmd::{validate::load_catalog, ReplayArgs};
use crate::exit::{
    consumer_error, io_error, read_input, CliError, CliResult, FAILURE, INTERNAL, SUCCESS,
};
use crate::output::{payload_preview, print_json, print_table, OutputFormat};

const TOPIC: &str = "replay";
const SUBSCRIPTION: &str = "subprims-replay";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verdict {
    Accept,
    Decline,
    Fail,
}

#[derive(Serialize, Debug)]
struct ReplayRow {
    line: usize,
    message_id: String,
    disposition: &'static str,
    payload: String,
}

#[derive(Serialize, Debug)]
struct ReplayOutput {
    file: String,
    total: usize,
    acknowledged: usize,
    negatively_acknowledged: usize,
    pending: usize,
    messages: Vec<ReplayRow>,
}

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = load_catalog(&args.schemas)?;
    let router = build_router(catalog, &args.decline, &args.fail)?;

    let input = read_input(&args.file)?;
    let lines = split_lines(&input);
    let properties = if args.properties.is_empty() {
        None
    } else {
        Some(RawProperties::Pairs(args.properties))
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;
    let messages = runtime.block_on(replay(router, lines, properties))?;

    let count = |name: &str| messages.iter().filter(|row| row.disposition == name).count();
    let output = ReplayOutput {
        file: args.file.display().to_string(),
        total: messages.len(),
        acknowledged: count("acknowledged"),
        negatively_acknowledged: count("negatively_acknowledged"),
        pending: count("pending"),
        messages,
    };
    print_output(&output, format);

    Ok(if output.negatively_acknowledged > 0 {
        FAILURE
    } else {
        SUCCESS
    })
}

fn build_router(catalog: SchemaCatalog, decline: &[String], fail: &[String]) -> CliResult<Router> {
    let known: BTreeSet<String> = catalog.type_names().into_iter().collect();
    if let Some(name) = decline.iter().chain(fail).find(|name| !known.contains(*name)) {
        return Err(CliError::usage(format!(
            "`{name}` is not a message type in the schema directory"
        )));
    }

    let mut builder = Router::builder(catalog);
    for type_name in &known {
        let verdict = if fail.contains(type_name) {
            Verdict::Fail
        } else if decline.contains(type_name) {
            Verdict::Decline
        } else {
            Verdict::Accept
        };
        let message_type = type_name.clone();
        builder = builder.handler(
            type_name,
            handler_fn(move |id: String, _: Value, _: PropertyMap| {
                let message_type = message_type.clone();
                async move {
                    match verdict {
                        Verdict::Accept => Ok(true),
                        Verdict::Decline => Ok(false),
                        Verdict::Fail => Err::<bool, HandlerError>(
                            format!("replay handler for {message_type} rejected {id}").into(),
                        ),
                    }
                }
            }),
        );
    }
    builder
        .build()
        .map_err(|err| consumer_error("router setup failed", err))
}

/// Non-blank lines with their 1-based line numbers.
fn split_lines(input: &[u8]) -> Vec<(usize, Vec<u8>)> {
    input
        .split(|byte| *byte == b'\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line.strip_suffix(b"\r").unwrap_or(line)))
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(number, line)| (number, line.to_vec()))
        .collect()
}

async fn replay(
    router: Router,
    lines: Vec<(usize, Vec<u8>)>,
    properties: Option<RawProperties>,
) -> CliResult<Vec<ReplayRow>> {
    let broker = MemoryBroker::new();
    let mut subscriber = Subscriber::new(
        broker.clone(),
        SubscriptionConfig::new(TOPIC, SUBSCRIPTION),
        router,
    );
    subscriber
        .initialize()
        .await
        .map_err(|err| consumer_error("subscribe failed", err))?;

    let mut rows = Vec::with_capacity(lines.len());
    for (line, payload) in lines {
        let preview = payload_preview(&payload);
        let id = broker
            .publish(TOPIC, payload, properties.clone())
            .await
            .map_err(|err| CliError::new(INTERNAL, format!("publish failed: {err}")))?;
        rows.push(ReplayRow {
            line,
            message_id: id.to_string(),
            disposition: disposition_name(broker.disposition(&id)),
            payload: preview,
        });
    }

    subscriber
        .close()
        .await
        .map_err(|err| consumer_error("close failed", err))?;
    Ok(rows)
}

fn disposition_name(disposition: Option<Disposition>) -> &'static str {
    match disposition {
        Some(Disposition::Acknowledged) => "acknowledged",
        Some(Disposition::NegativelyAcknowledged) => "negatively_acknowledged",
        Some(Disposition::Pending) | None => "pending",
    }
}

fn print_output(output: &ReplayOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => print_table(
            &["LINE", "MESSAGE", "DISPOSITION", "PAYLOAD"],
            output
                .messages
                .iter()
                .map(|row| {
                    vec![
                        row.line.to_string(),
                        row.message_id.clone(),
                        row.disposition.to_string(),
                        row.payload.clone(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for row in &output.messages {
                println!("line {}: {} {}", row.line, row.message_id, row.disposition);
            }
            println!(
                "{} messages: {} acknowledged, {} negatively acknowledged, {} pending",
                output.total, output.acknowledged, output.negatively_acknowledged, output.pending
            );
        }
    }
}
