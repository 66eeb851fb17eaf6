use serde::Serialize;
use subprims_envelope::{decode_envelope, properties_to_value, EnvelopeConfig, PropertyMap};
use subprims_schema::{CatalogConfig, SchemaCatalog, ValidationFailure, ValidationIssue};

use crate::cmd::{SchemaArgs, ValidateArgs};
use crate::exit::{read_input, schema_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize, Debug, Default)]
struct ValidateReport {
    file: String,
    valid: bool,
    message_id: Option<String>,
    message_type: Option<String>,
    /// Step that rejected the message: decode, route, data or properties.
    stage: Option<&'static str>,
    error: Option<String>,
    issues: Vec<ValidationIssue>,
}

impl ValidateReport {
    fn reject(&mut self, stage: &'static str, error: String) {
        self.valid = false;
        self.stage = Some(stage);
        self.error = Some(error);
    }

    fn reject_schema(&mut self, failure: ValidationFailure) {
        let stage = match failure.target {
            subprims_schema::ValidationTarget::Data => "data",
            subprims_schema::ValidationTarget::Properties => "properties",
        };
        self.reject(stage, failure.to_string());
        self.issues = failure.issues;
    }
}

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = load_catalog(&args.schemas)?;
    let payload = read_input(&args.file)?;
    let properties: PropertyMap = args.properties.into_iter().collect();

    let report = check(
        args.file.display().to_string(),
        &payload,
        &properties,
        &catalog,
    );
    print_report(&report, format);

    Ok(if report.valid { SUCCESS } else { DATA_INVALID })
}

pub(crate) fn load_catalog(args: &SchemaArgs) -> CliResult<SchemaCatalog> {
    let config = CatalogConfig {
        strict_mode: args.strict,
        ..CatalogConfig::default()
    };
    let catalog = SchemaCatalog::from_directory_with_config(&args.dir, config)
        .map_err(|err| schema_error("schema load failed", err))?;
    tracing::debug!(
        dir = %args.dir.display(),
        types = catalog.len(),
        strict = args.strict,
        "schema catalog loaded"
    );
    Ok(catalog)
}

fn check(
    file: String,
    payload: &[u8],
    properties: &PropertyMap,
    catalog: &SchemaCatalog,
) -> ValidateReport {
    let mut report = ValidateReport {
        file,
        valid: true,
        ..ValidateReport::default()
    };

    let envelope = match decode_envelope(payload, &EnvelopeConfig::default()) {
        Ok(envelope) => envelope,
        Err(err) => {
            report.reject("decode", err.to_string());
            return report;
        }
    };
    report.message_id = Some(envelope.id().to_string());
    report.message_type = Some(envelope.message_type().to_string());

    let Some(entry) = catalog.get(envelope.message_type()) else {
        report.reject(
            "route",
            format!(
                "no schema registered for message type `{}`",
                envelope.message_type()
            ),
        );
        return report;
    };

    if let Err(failure) =
        entry.validate_message(envelope.data(), &properties_to_value(properties))
    {
        report.reject_schema(failure);
    }
    report
}

fn print_report(report: &ValidateReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let details: Vec<(String, String)> = if report.issues.is_empty() {
                vec![(String::new(), report.error.clone().unwrap_or_default())]
            } else {
                report
                    .issues
                    .iter()
                    .map(|issue| (issue.path.clone(), issue.message.clone()))
                    .collect()
            };
            let rows = details
                .into_iter()
                .map(|(path, message)| {
                    vec![
                        report.file.clone(),
                        report.message_type.clone().unwrap_or_default(),
                        verdict(report).to_string(),
                        path,
                        message,
                    ]
                })
                .collect();
            print_table(&["FILE", "TYPE", "VERDICT", "PATH", "MESSAGE"], rows);
        }
        OutputFormat::Pretty => {
            println!(
                "{}: {} ({})",
                report.file,
                verdict(report),
                report.message_type.as_deref().unwrap_or("unknown type")
            );
            if report.issues.is_empty() {
                if let Some(error) = &report.error {
                    println!("  {error}");
                }
            }
            for issue in &report.issues {
                println!("  {}: {}", issue.path, issue.message);
            }
        }
    }
}

fn verdict(report: &ValidateReport) -> &'static str {
    match (report.valid, report.stage) {
        (true, _) => "valid",
        (false, Some("decode")) => "undecodable",
        (false, Some("route")) => "unknown type",
        (false, _) => "invalid",
    }
}
