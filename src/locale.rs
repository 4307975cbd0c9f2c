//! Locale-aware parsing of exact decimal numerals.
//!
//! The classifier never inspects locales itself; it asks the [`DecimalParser`]
//! held by the inference options. `en-US` (and bare `en`) uses the plain rule:
//! every `,` is dropped and the remainder must be a `.`-separated numeral.
//! Other locales use their own decimal and grouping separators, with grouping
//! only allowed in the integral part.

use std::{fmt, sync::Arc};

use crate::types::DecimalSpec;

/// Digit count and scale of a parsed numeral, the way an arbitrary precision
/// decimal reports them: `1.50` is precision 3, scale 2 and `1E5` is precision 1,
/// scale -5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeral {
    pub precision: u32,
    pub scale: i64,
}

impl Numeral {
    /// Decimal column type able to hold this numeral, if it fits under
    /// `max_precision`. Negative scales are folded into the precision. Numerals
    /// with fractional digits only qualify when `allow_fraction` is set.
    pub fn as_decimal(&self, max_precision: u32, allow_fraction: bool) -> Option<DecimalSpec> {
        if self.scale > 0 && !allow_fraction {
            return None;
        }
        let (precision, scale) = if self.scale <= 0 {
            (i64::from(self.precision) - self.scale, 0)
        } else {
            (i64::from(self.precision).max(self.scale), self.scale)
        };
        if precision > i64::from(max_precision) {
            return None;
        }
        Some(DecimalSpec {
            precision: u32::try_from(precision).ok()?,
            scale: u32::try_from(scale).ok()?,
        })
    }
}

pub trait DecimalParser: fmt::Debug + Send + Sync {
    /// Canonical locale id this parser was built for.
    fn locale(&self) -> &str;

    fn parse(&self, text: &str) -> Option<Numeral>;
}

/// `en-US` rule: thousands commas are ignored wherever they appear.
#[derive(Debug, Clone)]
pub struct PlainDecimalParser;

impl DecimalParser for PlainDecimalParser {
    fn locale(&self) -> &str {
        "en-US"
    }

    fn parse(&self, text: &str) -> Option<Numeral> {
        if text.contains(',') {
            let stripped: String = text.chars().filter(|c| *c != ',').collect();
            scan_numeral(&stripped, '.', &[])
        } else {
            scan_numeral(text, '.', &[])
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocaleDecimalParser {
    locale: String,
    decimal_separator: char,
    grouping: &'static [char],
}

impl LocaleDecimalParser {
    pub fn new(
        locale: impl Into<String>,
        decimal_separator: char,
        grouping: &'static [char],
    ) -> Self {
        Self {
            locale: locale.into(),
            decimal_separator,
            grouping,
        }
    }
}

impl DecimalParser for LocaleDecimalParser {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn parse(&self, text: &str) -> Option<Numeral> {
        scan_numeral(text, self.decimal_separator, self.grouping)
    }
}

const COMMA_GROUPING: &[char] = &[','];
const DOT_GROUPING: &[char] = &['.'];
const SPACE_GROUPING: &[char] = &[' ', '\u{00A0}', '\u{202F}'];
const APOSTROPHE_GROUPING: &[char] = &['\'', '\u{2019}'];

const DOT_DECIMAL_LANGUAGES: &[&str] = &["en", "ja", "zh", "ko", "th", "he", "hi", "ms"];
const COMMA_DECIMAL_DOT_GROUPING_LANGUAGES: &[&str] = &[
    "de", "es", "it", "nl", "pt", "id", "tr", "da", "el", "ro", "hr", "sl", "sr", "is",
];
const COMMA_DECIMAL_SPACE_GROUPING_LANGUAGES: &[&str] = &[
    "fr", "ru", "pl", "cs", "sk", "sv", "fi", "nb", "no", "uk", "hu", "bg", "lt", "lv", "et",
];

/// Normalizes `de_de`, `DE-de` and friends to `de-DE`.
pub fn canonical_locale_id(locale: &str) -> Option<String> {
    let mut parts = locale.trim().split(['-', '_']);
    let language = parts.next()?.to_ascii_lowercase();
    if language.len() < 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    match parts.next() {
        Some(region) if !region.is_empty() => {
            if parts.next().is_some() {
                return None;
            }
            Some(format!("{language}-{}", region.to_ascii_uppercase()))
        }
        Some(_) => None,
        None => Some(language),
    }
}

/// Builds the decimal grammar for a locale id, or `None` for an unknown locale.
pub fn decimal_parser_for_locale(locale: &str) -> Option<Arc<dyn DecimalParser>> {
    let canonical = canonical_locale_id(locale)?;
    let (language, region) = match canonical.split_once('-') {
        Some((language, region)) => (language, Some(region)),
        None => (canonical.as_str(), None),
    };

    let parser: Arc<dyn DecimalParser> = match (language, region) {
        ("en", None | Some("US")) => Arc::new(PlainDecimalParser),
        ("de" | "it" | "fr", Some("CH" | "LI")) => Arc::new(LocaleDecimalParser::new(
            canonical.clone(),
            '.',
            APOSTROPHE_GROUPING,
        )),
        ("es", Some("MX" | "US")) => {
            Arc::new(LocaleDecimalParser::new(canonical.clone(), '.', COMMA_GROUPING))
        }
        (lang, _) if DOT_DECIMAL_LANGUAGES.contains(&lang) => {
            Arc::new(LocaleDecimalParser::new(canonical.clone(), '.', COMMA_GROUPING))
        }
        (lang, _) if COMMA_DECIMAL_DOT_GROUPING_LANGUAGES.contains(&lang) => {
            Arc::new(LocaleDecimalParser::new(canonical.clone(), ',', DOT_GROUPING))
        }
        (lang, _) if COMMA_DECIMAL_SPACE_GROUPING_LANGUAGES.contains(&lang) => {
            Arc::new(LocaleDecimalParser::new(canonical.clone(), ',', SPACE_GROUPING))
        }
        _ => return None,
    };
    Some(parser)
}

fn scan_numeral(value: &str, decimal_separator: char, grouping: &[char]) -> Option<Numeral> {
    let mut mantissa = String::with_capacity(value.len());
    let mut exponent = String::new();
    let mut in_exponent = false;
    let mut exponent_sign_allowed = false;
    let mut decimal_index: Option<usize> = None;
    let mut sign_consumed = false;
    let mut pending_group = false;

    for ch in value.chars() {
        match ch {
            '0'..='9' => {
                if in_exponent {
                    exponent.push(ch);
                } else {
                    mantissa.push(ch);
                }
                pending_group = false;
            }
            c if c == decimal_separator => {
                if in_exponent || decimal_index.is_some() || pending_group {
                    return None;
                }
                decimal_index = Some(mantissa.len());
            }
            c if grouping.contains(&c) => {
                if in_exponent || decimal_index.is_some() || mantissa.is_empty() || pending_group
                {
                    return None;
                }
                pending_group = true;
            }
            'e' | 'E' => {
                if in_exponent || mantissa.is_empty() || pending_group {
                    return None;
                }
                in_exponent = true;
                exponent_sign_allowed = true;
                continue;
            }
            '+' | '-' => {
                if in_exponent && exponent_sign_allowed {
                    exponent.push(ch);
                    exponent_sign_allowed = false;
                } else if !in_exponent
                    && mantissa.is_empty()
                    && decimal_index.is_none()
                    && !sign_consumed
                {
                    sign_consumed = true;
                } else {
                    return None;
                }
                continue;
            }
            _ => return None,
        }
        exponent_sign_allowed = false;
    }

    if mantissa.is_empty() || pending_group {
        return None;
    }

    let exponent_value = if in_exponent {
        if !exponent.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        i64::from(exponent.parse::<i32>().ok()?)
    } else {
        0
    };

    let fraction_digits = decimal_index.map(|pos| mantissa.len() - pos).unwrap_or(0);
    let significant = mantissa.trim_start_matches('0');
    let precision = u32::try_from(significant.len().max(1)).ok()?;
    let scale = i64::try_from(fraction_digits).ok()? - exponent_value;

    Some(Numeral { precision, scale })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeral(precision: u32, scale: i64) -> Option<Numeral> {
        Some(Numeral { precision, scale })
    }

    #[test]
    fn plain_parser_reports_precision_and_scale() {
        let parser = PlainDecimalParser;
        assert_eq!(parser.parse("100"), numeral(3, 0));
        assert_eq!(parser.parse("-1.50"), numeral(3, 2));
        assert_eq!(parser.parse("0.05"), numeral(1, 2));
        assert_eq!(parser.parse("1E5"), numeral(1, -5));
        assert_eq!(parser.parse("1.5e+3"), numeral(2, -2));
        assert_eq!(parser.parse("12,345,678"), numeral(8, 0));
    }

    #[test]
    fn plain_parser_rejects_malformed_numerals() {
        let parser = PlainDecimalParser;
        for token in ["", "-", "1.2.3", "3.4.5", "1e", "e5", "1-2", "abc", "1 000", "--1"] {
            assert_eq!(parser.parse(token), None, "token {token:?}");
        }
    }

    #[test]
    fn german_locale_swaps_separators() {
        let parser = decimal_parser_for_locale("de_DE").expect("known locale");
        assert_eq!(parser.locale(), "de-DE");
        assert_eq!(parser.parse("1.234.567"), numeral(7, 0));
        assert_eq!(parser.parse("1.234,5"), numeral(5, 1));
        assert_eq!(parser.parse("1,2,3"), None);
        assert_eq!(parser.parse("1.234,"), numeral(4, 0));
        assert_eq!(parser.parse("1."), None);
    }

    #[test]
    fn french_locale_groups_with_spaces() {
        let parser = decimal_parser_for_locale("fr-FR").expect("known locale");
        assert_eq!(parser.parse("1 234,25"), numeral(6, 2));
        assert_eq!(parser.parse("1\u{202F}234"), numeral(4, 0));
        assert_eq!(parser.parse("1.5"), None);
    }

    #[test]
    fn unknown_locales_are_rejected() {
        assert!(decimal_parser_for_locale("xx-YY").is_none());
        assert!(decimal_parser_for_locale("").is_none());
        assert!(decimal_parser_for_locale("en-US-x").is_none());
        assert_eq!(
            decimal_parser_for_locale("EN").expect("english").locale(),
            "en-US"
        );
    }

    #[test]
    fn numerals_map_to_decimal_specs() {
        let whole = Numeral {
            precision: 3,
            scale: -2,
        };
        assert_eq!(
            whole.as_decimal(38, false),
            Some(DecimalSpec {
                precision: 5,
                scale: 0
            })
        );
        let fractional = Numeral {
            precision: 1,
            scale: 2,
        };
        assert_eq!(fractional.as_decimal(38, false), None);
        assert_eq!(
            fractional.as_decimal(38, true),
            Some(DecimalSpec {
                precision: 2,
                scale: 2
            })
        );
        let huge = Numeral {
            precision: 1,
            scale: -40,
        };
        assert_eq!(huge.as_decimal(38, false), None);
    }
}
