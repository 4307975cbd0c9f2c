//! Inference options and their YAML configuration form.
//!
//! [`InferConfig`] is what users write; [`InferOptions`] is the validated form
//! the classifier and the scan consume. Conversion resolves the decimal locale
//! into a [`DecimalParser`] strategy and checks the timestamp pattern, the time
//! zone and the precision cap up front so the scan itself never fails.

use std::{fmt, fs::File, io::BufReader, path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc,
    format::{Fixed, Item, StrftimeItems},
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    locale::{DecimalParser, PlainDecimalParser, canonical_locale_id, decimal_parser_for_locale},
    types::DECIMAL_MAX_PRECISION,
};

const DEFAULT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d"];
const DEFAULT_LOCALE: &str = "en-US";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown decimal locale '{0}'")]
    UnknownLocale(String),
    #[error(
        "Invalid time zone '{0}', expected UTC, an IANA zone such as Europe/Paris or a fixed offset such as +02:00"
    )]
    InvalidTimeZone(String),
    #[error("Invalid timestamp format '{0}'")]
    InvalidTimestampFormat(String),
    #[error("Unknown timestamp locale '{0}'")]
    UnknownTimestampLocale(String),
    #[error("Timestamp format '{pattern}' spells out month or weekday names, which only parse in English, not '{locale}'")]
    LocalizedNames { locale: String, pattern: String },
    #[error("Decimal precision cap must be between 1 and {max}, got {value}")]
    PrecisionCap { value: u32, max: u32 },
    #[error("Boolean spelling '{0}' is listed as both true and false")]
    AmbiguousBoolean(String),
    #[error("Boolean spellings cannot be empty strings")]
    EmptyBooleanSpelling,
}

/// User-facing configuration, typically loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferConfig {
    pub infer_schema: bool,
    pub null_value: String,
    pub nan_value: String,
    pub positive_inf: String,
    pub negative_inf: String,
    pub decimal_locale: String,
    pub timestamp_format: Option<String>,
    pub time_zone: String,
    pub timestamp_locale: String,
    pub true_values: Vec<String>,
    pub false_values: Vec<String>,
    pub max_precision: u32,
    pub prefers_decimal: bool,
    pub trim_values: bool,
    pub sample_rows: usize,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            infer_schema: true,
            null_value: String::new(),
            nan_value: "NaN".to_string(),
            positive_inf: "Inf".to_string(),
            negative_inf: "-Inf".to_string(),
            decimal_locale: DEFAULT_LOCALE.to_string(),
            timestamp_format: None,
            time_zone: "UTC".to_string(),
            timestamp_locale: DEFAULT_LOCALE.to_string(),
            true_values: vec!["true".to_string()],
            false_values: vec!["false".to_string()],
            max_precision: DECIMAL_MAX_PRECISION,
            prefers_decimal: false,
            trim_values: true,
            sample_rows: 0,
        }
    }
}

impl InferConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing inference config {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing inference config")
    }

    pub fn validate(&self) -> Result<InferOptions, ConfigError> {
        InferOptions::try_from(self.clone())
    }
}

/// Zone applied to timestamps that carry no offset of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Default for TimestampZone {
    fn default() -> Self {
        TimestampZone::Fixed(utc())
    }
}

impl TimestampZone {
    /// Wall-clock times skipped by a daylight saving transition name no instant
    /// and are rejected; repeated ones resolve to the earlier instant.
    fn admits(&self, naive: NaiveDateTime) -> bool {
        match self {
            TimestampZone::Fixed(offset) => naive.and_local_timezone(*offset).earliest().is_some(),
            TimestampZone::Named(tz) => naive.and_local_timezone(*tz).earliest().is_some(),
        }
    }
}

impl fmt::Display for TimestampZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampZone::Fixed(offset) => write!(f, "{offset}"),
            TimestampZone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Recognizes timestamps under an optional strftime pattern, a zone and a
/// locale. chrono only knows English month and weekday names, so a pattern
/// that spells names out is rejected for any other language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampParser {
    pattern: Option<String>,
    zone: TimestampZone,
    locale: String,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self {
            pattern: None,
            zone: TimestampZone::default(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl TimestampParser {
    pub fn new(
        pattern: Option<String>,
        zone: TimestampZone,
        locale: &str,
    ) -> Result<Self, ConfigError> {
        let locale = canonical_locale_id(locale)
            .ok_or_else(|| ConfigError::UnknownTimestampLocale(locale.to_string()))?;
        if let Some(fmt) = pattern.as_deref() {
            let items: Vec<Item<'_>> = StrftimeItems::new(fmt).collect();
            if fmt.trim().is_empty() || items.iter().any(|i| matches!(i, Item::Error)) {
                return Err(ConfigError::InvalidTimestampFormat(fmt.to_string()));
            }
            if locale.split('-').next() != Some("en") && items.iter().any(spells_out_names) {
                return Err(ConfigError::LocalizedNames {
                    locale,
                    pattern: fmt.to_string(),
                });
            }
        }
        Ok(Self {
            pattern,
            zone,
            locale,
        })
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn zone(&self) -> TimestampZone {
        self.zone
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn matches(&self, value: &str) -> bool {
        match self.pattern.as_deref() {
            Some(fmt) => self.matches_pattern(value, fmt),
            None => {
                DateTime::parse_from_rfc3339(value).is_ok()
                    || DEFAULT_DATETIME_FORMATS
                        .iter()
                        .any(|fmt| self.matches_local(value, fmt))
                    || DEFAULT_DATE_FORMATS
                        .iter()
                        .any(|fmt| self.matches_local_date(value, fmt))
            }
        }
    }

    fn matches_pattern(&self, value: &str, fmt: &str) -> bool {
        if fmt.contains("%z") || fmt.contains("%:z") || fmt.contains("%#z") {
            return DateTime::parse_from_str(value, fmt).is_ok();
        }
        self.matches_local(value, fmt) || self.matches_local_date(value, fmt)
    }

    fn matches_local(&self, value: &str, fmt: &str) -> bool {
        NaiveDateTime::parse_from_str(value, fmt).is_ok_and(|naive| self.zone.admits(naive))
    }

    fn matches_local_date(&self, value: &str, fmt: &str) -> bool {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .is_some_and(|naive| self.zone.admits(naive))
    }
}

fn spells_out_names(item: &Item<'_>) -> bool {
    matches!(
        item,
        Item::Fixed(
            Fixed::ShortMonthName
                | Fixed::LongMonthName
                | Fixed::ShortWeekdayName
                | Fixed::LongWeekdayName
                | Fixed::UpperAmPm
                | Fixed::LowerAmPm
        )
    )
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parses `UTC`, `GMT`, `Z`, an IANA zone id such as `Europe/Paris`, or a fixed
/// `±HH:MM` / `±HHMM` / `±HH` offset.
pub fn parse_time_zone(value: &str) -> Result<TimestampZone, ConfigError> {
    let trimmed = value.trim();
    if matches!(trimmed.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z") {
        return Ok(TimestampZone::Fixed(utc()));
    }
    if let Ok(tz) = trimmed.parse::<Tz>() {
        return Ok(TimestampZone::Named(tz));
    }
    parse_fixed_offset(trimmed)
        .map(TimestampZone::Fixed)
        .ok_or_else(|| ConfigError::InvalidTimeZone(value.to_string()))
}

fn parse_fixed_offset(value: &str) -> Option<FixedOffset> {
    let offset = value
        .strip_prefix("UTC")
        .or_else(|| value.strip_prefix("GMT"))
        .unwrap_or(value);
    let (sign, body) = match offset.chars().next() {
        Some('+') => (1, &offset[1..]),
        Some('-') => (-1, &offset[1..]),
        _ => return None,
    };
    let digits: String = body.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) || body.matches(':').count() > 1 {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 18 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Validated options shared by every worker of a scan.
#[derive(Debug, Clone)]
pub struct InferOptions {
    pub infer_schema: bool,
    pub null_value: String,
    pub nan_value: String,
    pub positive_inf: String,
    pub negative_inf: String,
    pub decimal_parser: Arc<dyn DecimalParser>,
    pub timestamp: TimestampParser,
    pub true_values: Vec<String>,
    pub false_values: Vec<String>,
    pub max_precision: u32,
    pub prefers_decimal: bool,
    pub trim_values: bool,
    pub sample_rows: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        let config = InferConfig::default();
        Self {
            infer_schema: config.infer_schema,
            null_value: config.null_value,
            nan_value: config.nan_value,
            positive_inf: config.positive_inf,
            negative_inf: config.negative_inf,
            decimal_parser: Arc::new(PlainDecimalParser),
            timestamp: TimestampParser::default(),
            true_values: config.true_values,
            false_values: config.false_values,
            max_precision: config.max_precision,
            prefers_decimal: config.prefers_decimal,
            trim_values: config.trim_values,
            sample_rows: config.sample_rows,
        }
    }
}

impl TryFrom<InferConfig> for InferOptions {
    type Error = ConfigError;

    fn try_from(config: InferConfig) -> Result<Self, Self::Error> {
        if config.max_precision == 0 || config.max_precision > DECIMAL_MAX_PRECISION {
            return Err(ConfigError::PrecisionCap {
                value: config.max_precision,
                max: DECIMAL_MAX_PRECISION,
            });
        }
        let decimal_parser = decimal_parser_for_locale(&config.decimal_locale)
            .ok_or_else(|| ConfigError::UnknownLocale(config.decimal_locale.clone()))?;
        let zone = parse_time_zone(&config.time_zone)?;
        let timestamp =
            TimestampParser::new(config.timestamp_format, zone, &config.timestamp_locale)?;
        let true_values = normalize_spellings(config.true_values)?;
        let false_values = normalize_spellings(config.false_values)?;
        if let Some(shared) = true_values
            .iter()
            .find(|value| false_values.iter().any(|other| other == *value))
        {
            return Err(ConfigError::AmbiguousBoolean(shared.clone()));
        }

        Ok(Self {
            infer_schema: config.infer_schema,
            null_value: config.null_value,
            nan_value: config.nan_value,
            positive_inf: config.positive_inf,
            negative_inf: config.negative_inf,
            decimal_parser,
            timestamp,
            true_values,
            false_values,
            max_precision: config.max_precision,
            prefers_decimal: config.prefers_decimal,
            trim_values: config.trim_values,
            sample_rows: config.sample_rows,
        })
    }
}

fn normalize_spellings(values: Vec<String>) -> Result<Vec<String>, ConfigError> {
    values
        .into_iter()
        .map(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::EmptyBooleanSpelling)
            } else {
                Ok(trimmed.to_lowercase())
            }
        })
        .collect()
}

impl InferOptions {
    pub fn with_null_value(mut self, token: impl Into<String>) -> Self {
        self.null_value = token.into();
        self
    }

    pub fn with_prefers_decimal(mut self, enabled: bool) -> Self {
        self.prefers_decimal = enabled;
        self
    }

    pub fn with_infer_schema(mut self, enabled: bool) -> Self {
        self.infer_schema = enabled;
        self
    }

    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    pub fn is_boolean(&self, value: &str) -> bool {
        let lowered = value.to_lowercase();
        self.true_values.iter().any(|v| *v == lowered)
            || self.false_values.iter().any(|v| *v == lowered)
    }

    pub fn is_special_double(&self, value: &str) -> bool {
        value == self.nan_value || value == self.positive_inf || value == self.negative_inf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let options = InferConfig::default().validate().expect("defaults are valid");
        assert!(options.infer_schema);
        assert_eq!(options.max_precision, 38);
        assert_eq!(options.decimal_parser.locale(), "en-US");
        assert!(options.is_boolean("TRUE"));
        assert!(!options.is_boolean("yes"));
    }

    #[test]
    fn yaml_config_overrides_defaults() {
        let config = InferConfig::from_yaml_str(
            "null_value: NA\ndecimal_locale: de-DE\ntrue_values: [ja, Yes]\nfalse_values: [nein]\nmax_precision: 20\n",
        )
        .expect("parse yaml");
        assert_eq!(config.null_value, "NA");
        assert_eq!(config.nan_value, "NaN");
        let options = config.validate().expect("valid config");
        assert_eq!(options.decimal_parser.locale(), "de-DE");
        assert_eq!(options.true_values, vec!["ja", "yes"]);
        assert!(options.is_boolean("Nein"));
        assert_eq!(options.max_precision, 20);
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        assert!(InferConfig::from_yaml_str("nul_value: NA\n").is_err());
    }

    #[test]
    fn invalid_settings_surface_config_errors() {
        let mut config = InferConfig {
            decimal_locale: "zz-ZZ".to_string(),
            ..InferConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::UnknownLocale("zz-ZZ".to_string())
        );

        config = InferConfig {
            max_precision: 39,
            ..InferConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::PrecisionCap { value: 39, .. }
        ));

        config = InferConfig {
            true_values: vec!["Y".to_string()],
            false_values: vec!["y".to_string()],
            ..InferConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::AmbiguousBoolean("y".to_string())
        );

        config = InferConfig {
            timestamp_format: Some("%Y-%m-%d %Q".to_string()),
            ..InferConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidTimestampFormat(_)
        ));
    }

    fn offset_seconds(value: &str) -> i32 {
        match parse_time_zone(value).expect("valid zone") {
            TimestampZone::Fixed(offset) => offset.local_minus_utc(),
            TimestampZone::Named(tz) => panic!("expected a fixed offset, got {tz}"),
        }
    }

    fn parser(pattern: &str, zone: &str, locale: &str) -> Result<TimestampParser, ConfigError> {
        TimestampParser::new(
            Some(pattern.to_string()),
            parse_time_zone(zone).expect("valid zone"),
            locale,
        )
    }

    #[test]
    fn time_zones_parse_as_fixed_offsets() {
        assert_eq!(offset_seconds("utc"), 0);
        assert_eq!(offset_seconds("+02:00"), 7200);
        assert_eq!(offset_seconds("-0530"), -19800);
        assert_eq!(offset_seconds("UTC+1"), 3600);
        assert!(parse_time_zone("+25:00").is_err());
        assert!(parse_time_zone("+1:2:3").is_err());
        assert!(parse_time_zone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn iana_zone_names_are_accepted() {
        assert_eq!(
            parse_time_zone("Europe/Paris"),
            Ok(TimestampZone::Named(Tz::Europe__Paris))
        );
        assert_eq!(
            parse_time_zone(" America/New_York ").map(|zone| zone.to_string()),
            Ok("America/New_York".to_string())
        );
        let options = InferConfig {
            time_zone: "Asia/Tokyo".to_string(),
            ..InferConfig::default()
        }
        .validate()
        .expect("valid config");
        assert_eq!(options.timestamp.zone(), TimestampZone::Named(Tz::Asia__Tokyo));
    }

    #[test]
    fn wall_clock_gaps_are_not_timestamps_in_named_zones() {
        let paris = TimestampParser::new(
            None,
            parse_time_zone("Europe/Paris").expect("zone"),
            "en-US",
        )
        .expect("parser");
        assert!(!paris.matches("2024-03-31 02:30:00"));
        assert!(paris.matches("2024-03-31 03:30:00"));
        assert!(paris.matches("2024-10-27 02:30:00"));

        let fixed =
            TimestampParser::new(None, parse_time_zone("+05:00").expect("zone"), "en-US")
                .expect("parser");
        assert!(fixed.matches("2024-03-31 02:30:00"));
    }

    #[test]
    fn timestamp_locale_is_validated() {
        let german = parser("%d.%m.%Y %H:%M", "UTC", "de_de").expect("numeric pattern");
        assert_eq!(german.locale(), "de-DE");
        assert!(german.matches("31.12.2024 23:59"));

        assert_eq!(
            parser("%d %B %Y", "UTC", "de-DE"),
            Err(ConfigError::LocalizedNames {
                locale: "de-DE".to_string(),
                pattern: "%d %B %Y".to_string(),
            })
        );
        let english = parser("%d %B %Y", "UTC", "en-GB").expect("english names");
        assert!(english.matches("31 December 2024"));

        let config = InferConfig {
            timestamp_locale: "not a locale".to_string(),
            ..InferConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::UnknownTimestampLocale("not a locale".to_string())
        );
    }

    #[test]
    fn default_timestamp_formats_accept_iso_variants() {
        let parser = TimestampParser::default();
        assert!(parser.matches("2024-01-01T08:30:00Z"));
        assert!(parser.matches("2024-01-01 08:30:00"));
        assert!(parser.matches("2024-01-01 08:30:00.125"));
        assert!(parser.matches("2024-01-01T08:30"));
        assert!(parser.matches("2024-01-01"));
        assert!(!parser.matches("01/02/2024"));
        assert!(!parser.matches("2024-13-01"));
        assert!(!parser.matches("1"));
    }

    #[test]
    fn custom_timestamp_pattern_is_honoured() {
        let custom = parser("%d/%m/%Y %H:%M", "UTC", "en-US").expect("pattern");
        assert_eq!(custom.pattern(), Some("%d/%m/%Y %H:%M"));
        assert!(custom.matches("31/12/2024 23:59"));
        assert!(!custom.matches("2024-12-31 23:59"));

        let dated = parser("%d.%m.%Y", "UTC", "en-US").expect("pattern");
        assert!(dated.matches("31.12.2024"));

        let zoned = parser("%Y-%m-%d %H:%M %z", "UTC", "en-US").expect("pattern");
        assert!(zoned.matches("2024-12-31 23:59 +0100"));
        assert!(!zoned.matches("2024-12-31 23:59"));
    }
}
