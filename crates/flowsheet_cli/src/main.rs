// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flowsheet-reroute` - recompute connection paths of a saved diagram.
//!
//! Loads a `.ron` or `.json` diagram document, re-routes every connection
//! from its grips and adjustment scalars, and writes the result either to
//! `--out` or to stdout.

use flowsheet_routing::document::DocumentFormat;
use flowsheet_routing::{ConfigError, DiagramDocument, DocumentError, RoutingConfig};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    format: Option<DocumentFormat>,
    print_config: bool,
}

fn usage() -> &'static str {
    "flowsheet-reroute\n\
\n\
USAGE:\n\
  flowsheet-reroute [--config <routing.ron>] [--out <path>] [--format ron|json] <diagram.ron|diagram.json>\n\
  flowsheet-reroute --print-config [--config <routing.ron>]\n\
\n\
NOTES:\n\
  - Without --out the re-routed document is printed to stdout.\n\
  - The output format follows --format, else the --out extension, else the input extension.\n\
  - Log verbosity is controlled with RUST_LOG.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--print-config" => args.print_config = true,
            "--config" => {
                let path = it.next().ok_or(CliError::Usage(usage()))?;
                args.config = Some(PathBuf::from(path));
            }
            "--out" | "-o" => {
                let path = it.next().ok_or(CliError::Usage(usage()))?;
                args.out = Some(PathBuf::from(path));
            }
            "--format" => {
                args.format = match it.next().map(String::as_str) {
                    Some("ron") => Some(DocumentFormat::Ron),
                    Some("json") => Some(DocumentFormat::Json),
                    _ => return Err(CliError::Usage(usage())),
                };
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(PathBuf::from(path));
            }
        }
    }

    if args.input.is_none() && !args.print_config {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => RoutingConfig::load(path)?,
        None => RoutingConfig::default(),
    };

    if args.print_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    let input = args.input.ok_or(CliError::Usage(usage()))?;
    let document = DiagramDocument::load(&input)?;

    let mut diagram = document.into_diagram(config);
    diagram.reroute_all();
    tracing::info!(
        "Re-routed {} connection(s) across {} node(s)",
        diagram.connection_count(),
        diagram.node_count()
    );

    let rerouted = DiagramDocument::from_diagram(&diagram);
    match (&args.out, args.format) {
        (Some(out), None) => rerouted.save(out)?,
        (out, format) => {
            let format = match format {
                Some(format) => format,
                None => DocumentFormat::from_path(&input)?,
            };
            let text = match format {
                DocumentFormat::Ron => rerouted.to_ron()?,
                DocumentFormat::Json => rerouted.to_json()?,
            };
            match out {
                Some(out) => std::fs::write(out, text)?,
                None => println!("{text}"),
            }
        }
    }
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
