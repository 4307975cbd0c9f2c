use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{options::InferConfig, schema::SchemaFormat};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer column types from tabular data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a delimited file and write the inferred schema
    Infer(InferArgs),
    /// Validate an inference configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for SchemaFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => SchemaFormat::Yaml,
            OutputFormat::Json => SchemaFormat::Json,
        }
    }
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Input CSV file to scan ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination schema file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Schema format; defaults to the output extension, else YAML
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// YAML file with inference settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Treat the first record as data and name columns column_1..column_n
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Number of rows to scan (0 means full scan)
    #[arg(long)]
    pub sample_rows: Option<usize>,
    /// Token treated as a missing value
    #[arg(long)]
    pub null_value: Option<String>,
    /// Locale governing decimal and grouping separators, e.g. de-DE
    #[arg(long)]
    pub decimal_locale: Option<String>,
    /// chrono strftime pattern for timestamp columns
    #[arg(long)]
    pub timestamp_format: Option<String>,
    /// Time zone for timestamps without an offset (UTC, Europe/Paris or +HH:MM)
    #[arg(long)]
    pub time_zone: Option<String>,
    /// Locale of timestamp text; month and weekday names parse in English only
    #[arg(long)]
    pub timestamp_locale: Option<String>,
    /// Type fractional numerals as decimals instead of doubles
    #[arg(long)]
    pub prefers_decimal: bool,
    /// Skip the scan and type every column as text
    #[arg(long = "no-infer")]
    pub no_infer: bool,
    /// Scan rows on the rayon thread pool
    #[arg(long)]
    pub parallel: bool,
}

impl InferArgs {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut InferConfig) {
        if let Some(rows) = self.sample_rows {
            config.sample_rows = rows;
        }
        if let Some(token) = &self.null_value {
            config.null_value = token.clone();
        }
        if let Some(locale) = &self.decimal_locale {
            config.decimal_locale = locale.clone();
        }
        if let Some(pattern) = &self.timestamp_format {
            config.timestamp_format = Some(pattern.clone());
        }
        if let Some(zone) = &self.time_zone {
            config.time_zone = zone.clone();
        }
        if let Some(locale) = &self.timestamp_locale {
            config.timestamp_locale = locale.clone();
        }
        if self.prefers_decimal {
            config.prefers_decimal = true;
        }
        if self.no_infer {
            config.infer_schema = false;
        }
    }
}

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    /// YAML file with inference settings
    #[arg(long)]
    pub config: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_and_characters_parse() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn overrides_take_precedence_over_config() {
        let cli = Cli::parse_from([
            "sheet-infer",
            "infer",
            "-i",
            "data.csv",
            "--null-value",
            "NA",
            "--decimal-locale",
            "de-DE",
            "--sample-rows",
            "10",
            "--time-zone",
            "Europe/Paris",
            "--timestamp-locale",
            "fr-FR",
            "--no-infer",
        ]);
        let Commands::Infer(args) = cli.command else {
            panic!("expected infer command");
        };
        let mut config = InferConfig {
            null_value: "-".to_string(),
            prefers_decimal: true,
            ..InferConfig::default()
        };
        args.apply_overrides(&mut config);
        assert_eq!(config.null_value, "NA");
        assert_eq!(config.decimal_locale, "de-DE");
        assert_eq!(config.sample_rows, 10);
        assert_eq!(config.time_zone, "Europe/Paris");
        assert_eq!(config.timestamp_locale, "fr-FR");
        assert!(!config.infer_schema);
        assert!(config.prefers_decimal);
    }
}
