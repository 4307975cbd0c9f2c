//! Classification of a single text cell against the type its column has so far.
//!
//! Attempts run from the narrowest type to the widest: integer, long, decimal,
//! double, timestamp, boolean, and finally text. The first parse that succeeds
//! decides. Parse failures are never errors; they fall through to the next
//! attempt.
//!
//! A column that has already proven a wider numeric type skips the narrower
//! numeric attempts. The skip only applies where it cannot change
//! `join(so_far, classify(..))`: a `Long` column skips the `i32` attempt and a
//! `Double` column skips every exact numeric attempt. `Decimal`, `Timestamp` and
//! `Boolean` columns still run the full tower, because an integer observed there
//! joins differently than a decimal or a timestamp would.
//!
//! Float spellings without a digit, such as `inf` or `Infinity`, are not
//! doubles on their own even though `f64` parses them. Only the configured
//! NaN and infinity tokens stand in for those values.

use crate::{
    options::InferOptions,
    types::{DecimalSpec, SemanticType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Attempt {
    Integer,
    Long,
    Double,
}

fn first_attempt(so_far: &SemanticType) -> Attempt {
    match so_far {
        SemanticType::Null
        | SemanticType::Integer
        | SemanticType::Decimal(_)
        | SemanticType::Timestamp
        | SemanticType::Boolean
        | SemanticType::Text => Attempt::Integer,
        SemanticType::Long => Attempt::Long,
        SemanticType::Double => Attempt::Double,
    }
}

/// Narrowest type able to represent `text`, given the column's type so far.
pub fn classify(text: &str, so_far: &SemanticType, options: &InferOptions) -> SemanticType {
    if *so_far == SemanticType::Text {
        return SemanticType::Text;
    }
    let token = if options.trim_values { text.trim() } else { text };
    if token.is_empty() || token == options.null_value {
        return SemanticType::Null;
    }

    let start = first_attempt(so_far);
    if start <= Attempt::Integer && token.parse::<i32>().is_ok() {
        return SemanticType::Integer;
    }
    if start <= Attempt::Long && token.parse::<i64>().is_ok() {
        return SemanticType::Long;
    }
    if start <= Attempt::Long
        && let Some(spec) = decimal_literal(token, options)
    {
        return SemanticType::Decimal(spec);
    }
    if is_double_literal(token, options) {
        return SemanticType::Double;
    }
    if options.timestamp.matches(token) {
        return SemanticType::Timestamp;
    }
    if options.is_boolean(token) {
        return SemanticType::Boolean;
    }
    SemanticType::Text
}

/// Exact numeral under the configured locale that fits a decimal column.
pub fn decimal_literal(token: &str, options: &InferOptions) -> Option<DecimalSpec> {
    options
        .decimal_parser
        .parse(token)?
        .as_decimal(options.max_precision, options.prefers_decimal)
}

/// Any floating point spelling, locale numeral, or special NaN/Infinity token.
pub fn is_double_literal(token: &str, options: &InferOptions) -> bool {
    if options.is_special_double(token) {
        return true;
    }
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    (has_digit && token.parse::<f64>().is_ok()) || options.decimal_parser.parse(token).is_some()
}
