use serde::Serialize;

use crate::cmd::{validate::load_catalog, CatalogArgs, SchemaArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct CatalogOutput {
    dir: String,
    strict: bool,
    count: usize,
    types: Vec<String>,
}

pub fn run(args: CatalogArgs, format: OutputFormat) -> CliResult<i32> {
    let schemas = SchemaArgs {
        dir: args.dir,
        strict: args.strict,
    };
    let catalog = load_catalog(&schemas)?;

    let output = CatalogOutput {
        dir: schemas.dir.display().to_string(),
        strict: schemas.strict,
        count: catalog.len(),
        types: catalog.type_names(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_table(
            &["TYPE"],
            output.types.iter().map(|name| vec![name.clone()]).collect(),
        ),
        OutputFormat::Pretty => {
            println!("{} message types in {}", output.count, output.dir);
            for name in &output.types {
                println!("  {name}");
            }
        }
    }
    Ok(SUCCESS)
}
