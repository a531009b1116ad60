//! DPL command line
//!
//! Parses a DPL file and prints the environment, or its documentation, as JSON.
//!
//! Usage:
//!   dpl params.dpl --format tuple --query "box.*" --tags input --pretty
//!   dpl params.dpl --docs

use clap::Parser;
use dpl::{Dpl, DplError, Format, ParseOptions, Parsed};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "dpl")]
#[command(about = "Parse a DPL file and print its parameters as JSON")]
struct Args {
    /// DPL file to parse
    file: PathBuf,

    /// Output format: value, tuple, type, node or quantity
    #[arg(short, long, default_value = "value")]
    format: String,

    /// Select nodes, e.g. `box.*` or `box.width`
    #[arg(short, long)]
    query: Option<String>,

    /// Keep only nodes with one of these tags
    #[arg(short, long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Print documentation instead of data
    #[arg(long)]
    docs: bool,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

fn run(args: &Args) -> Result<JsonValue, DplError> {
    let format: Format = args.format.parse()?;
    let mut options = ParseOptions::new().with_docs(args.docs);
    if let Some(dir) = args.file.parent().filter(|d| !d.as_os_str().is_empty()) {
        options = options.with_base_dir(dir);
    }
    let file = args.file.file_name().map(PathBuf::from).unwrap_or_else(|| args.file.clone());

    let mut dpl = Dpl::with_options(options);
    dpl.add_file(&file)?;
    debug!(file = %args.file.display(), docs = args.docs, "parsing file");

    match dpl.run()? {
        Parsed::Docs(docs) => docs.to_json(),
        Parsed::Data(env) => {
            let tags = (!args.tags.is_empty()).then_some(args.tags.as_slice());
            env.to_json(format, args.query.as_deref(), tags)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let output = run(&args).and_then(|json| {
        let text = if args.pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        };
        text.map_err(|err| DplError::invalid_input("Output cannot be serialized").with_arg(err))
    });

    match output {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
