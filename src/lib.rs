pub mod classify;
pub mod cli;
pub mod infer;
pub mod io_utils;
pub mod locale;
pub mod options;
pub mod schema;
pub mod types;
pub mod value;

use std::{env, io, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{CheckConfigArgs, Cli, Commands, InferArgs},
    io_utils::CsvRowSource,
    options::{InferConfig, InferOptions},
    schema::SchemaFormat,
};

pub use crate::{
    infer::{ScanStats, empty_accumulator, finalize, infer, infer_row, merge_columns},
    schema::{Field, Schema},
    types::{DecimalSpec, SemanticType, join},
    value::{RawValue, Row},
};

#[cfg(feature = "parallel")]
pub use crate::infer::infer_parallel;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_infer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(args) => handle_infer(&args),
        Commands::CheckConfig(args) => handle_check_config(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<InferConfig> {
    match path {
        Some(path) => {
            InferConfig::load(path).with_context(|| format!("Loading configuration from {path:?}"))
        }
        None => Ok(InferConfig::default()),
    }
}

fn handle_infer(args: &InferArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    let options = InferOptions::try_from(config).context("Validating inference configuration")?;

    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Inferring schema for '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let mut source = CsvRowSource::open(&args.input, delimiter, encoding, !args.no_header)
        .with_context(|| format!("Opening {:?}", args.input))?;
    let header = source.headers().to_vec();
    debug!("Header: {header:?}");

    let (schema, stats) = if args.parallel {
        scan_parallel(&mut source, &header, &options)?
    } else {
        infer::try_infer_with_stats(&mut source, &header, &options)
            .with_context(|| format!("Scanning {:?}", args.input))?
    };
    if source.decode_errors() > 0 {
        warn!(
            "{} field(s) could not be decoded as {} and were treated as errors",
            source.decode_errors(),
            encoding.name()
        );
    }

    let format = match (args.format, &args.output) {
        (Some(format), _) => format.into(),
        (None, Some(path)) => SchemaFormat::for_path(path),
        (None, None) => SchemaFormat::Yaml,
    };
    match &args.output {
        Some(path) => {
            schema.save(path, format)?;
            info!(
                "Schema for {} column(s) from {} row(s) written to {:?}",
                schema.len(),
                stats.rows_scanned(),
                path
            );
        }
        None => {
            schema.write_to(io::stdout().lock(), format)?;
            info!(
                "Schema for {} column(s) from {} row(s) written to stdout",
                schema.len(),
                stats.rows_scanned()
            );
        }
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn scan_parallel(
    source: &mut CsvRowSource,
    header: &[String],
    options: &InferOptions,
) -> Result<(Schema, ScanStats)> {
    if !options.infer_schema {
        return infer::try_infer_with_stats(std::iter::empty::<Result<Row>>(), header, options);
    }
    let limit = match options.sample_rows {
        0 => usize::MAX,
        n => n,
    };
    let rows = source.by_ref().take(limit).collect::<Result<Vec<Row>>>()?;
    debug!("Buffered {} row(s) for parallel scan", rows.len());
    let schema = infer::infer_parallel(&rows, header, options);
    Ok((schema, ScanStats::new(rows.len(), header.len())))
}

#[cfg(not(feature = "parallel"))]
fn scan_parallel(
    source: &mut CsvRowSource,
    header: &[String],
    options: &InferOptions,
) -> Result<(Schema, ScanStats)> {
    warn!("Built without the 'parallel' feature; scanning sequentially");
    infer::try_infer_with_stats(source, header, options)
}

fn handle_check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = load_config(Some(&args.config))?;
    let options = InferOptions::try_from(config)
        .with_context(|| format!("Validating configuration {:?}", args.config))?;
    info!(
        "Configuration {:?} is valid (decimal locale '{}', precision cap {})",
        args.config,
        options.decimal_parser.locale(),
        options.max_precision
    );
    info!(
        "Timestamps: format {}, time zone {}, locale '{}'",
        options.timestamp.pattern().unwrap_or("ISO 8601 defaults"),
        options.timestamp.zone(),
        options.timestamp.locale()
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
