//! Semantic column types and the lattice `join` used to combine them.
//!
//! Types form a lattice with [`SemanticType::Null`] at the bottom and
//! [`SemanticType::Text`] at the top. [`join`] computes the least upper bound of
//! two types and is commutative, associative and idempotent, which is what lets
//! independently scanned row ranges be merged in any grouping.
//!
//! ## Numeric tower
//!
//! `Integer ⊑ Long ⊑ Decimal ⊑ Double`. Integral types meeting a decimal are
//! widened to the decimal able to hold them (`Decimal(10,0)` and `Decimal(20,0)`),
//! and two decimals merge by keeping the widest integral range and the widest
//! scale. A merge that would need more than the precision cap becomes `Double`.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Largest precision a fixed-point decimal column may carry.
pub const DECIMAL_MAX_PRECISION: u32 = 38;

const INTEGER_DECIMAL_DIGITS: u32 = 10;
const LONG_DECIMAL_DIGITS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalSpec {
    pub precision: u32,
    pub scale: u32,
}

impl DecimalSpec {
    pub fn new(precision: u32, scale: u32) -> Result<Self> {
        let spec = Self { precision, scale };
        spec.ensure_valid(DECIMAL_MAX_PRECISION)?;
        Ok(spec)
    }

    pub fn ensure_valid(&self, max_precision: u32) -> Result<()> {
        ensure!(self.precision > 0, "Decimal precision must be positive");
        ensure!(
            self.precision <= max_precision,
            "Decimal precision must be <= {}",
            max_precision
        );
        ensure!(
            self.scale <= self.precision,
            "Decimal scale ({}) cannot exceed precision ({})",
            self.scale,
            self.precision
        );
        Ok(())
    }

    /// Digits available left of the decimal point.
    pub fn range(&self) -> u32 {
        self.precision - self.scale
    }

    pub fn signature(&self) -> String {
        format!("decimal({},{})", self.precision, self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SemanticType {
    #[default]
    Null,
    Boolean,
    Integer,
    Long,
    Decimal(DecimalSpec),
    Double,
    Timestamp,
    Text,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Null => "null",
            SemanticType::Boolean => "boolean",
            SemanticType::Integer => "integer",
            SemanticType::Long => "long",
            SemanticType::Decimal(_) => "decimal",
            SemanticType::Double => "double",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Text => "text",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "boolean",
            "integer",
            "long",
            "decimal(precision,scale)",
            "double",
            "timestamp",
            "text",
        ]
    }

    pub fn signature_token(&self) -> String {
        match self {
            SemanticType::Decimal(spec) => spec.signature(),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature_token())
    }
}

impl FromStr for SemanticType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "null" => Ok(SemanticType::Null),
            "boolean" | "bool" => Ok(SemanticType::Boolean),
            "integer" | "int" => Ok(SemanticType::Integer),
            "long" | "bigint" => Ok(SemanticType::Long),
            "double" | "float" => Ok(SemanticType::Double),
            "timestamp" | "datetime" => Ok(SemanticType::Timestamp),
            "text" | "string" => Ok(SemanticType::Text),
            other if other.starts_with("decimal") => parse_decimal_type(&normalized),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                SemanticType::variants().join(", ")
            )),
        }
    }
}

fn parse_decimal_type(value: &str) -> Result<SemanticType> {
    let start = value.find('(').ok_or_else(|| {
        anyhow!("Decimal type must specify precision and scale, e.g. decimal(18,4)")
    })?;
    ensure!(
        value.ends_with(')'),
        "Decimal type must close with ')', e.g. decimal(18,4)"
    );
    let inner = &value[start + 1..value.len() - 1];
    let parts = inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("Decimal precision and scale must be integers: '{value}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let &[precision, scale] = parts.as_slice() else {
        return Err(anyhow!(
            "Decimal type requires exactly two arguments, e.g. decimal(18,4)"
        ));
    };
    Ok(SemanticType::Decimal(DecimalSpec::new(precision, scale)?))
}

impl Serialize for SemanticType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.signature_token())
    }
}

impl<'de> Deserialize<'de> for SemanticType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        SemanticType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

/// Least upper bound of two types under the default precision cap.
pub fn join(left: &SemanticType, right: &SemanticType) -> SemanticType {
    join_with_cap(left, right, DECIMAL_MAX_PRECISION)
}

/// Least upper bound of two types, degrading decimals wider than `max_precision`
/// to `Double`. Pairs without a common type resolve to `Text`.
pub fn join_with_cap(
    left: &SemanticType,
    right: &SemanticType,
    max_precision: u32,
) -> SemanticType {
    tightest_common_type(left, right, max_precision)
        .or_else(|| promote_incompatible(left, right, max_precision))
        .unwrap_or(SemanticType::Text)
}

fn tightest_common_type(
    left: &SemanticType,
    right: &SemanticType,
    max_precision: u32,
) -> Option<SemanticType> {
    use SemanticType::*;

    match (left, right) {
        (a, b) if a == b => Some(*a),
        (Null, other) | (other, Null) => Some(*other),
        (Integer, Long) | (Long, Integer) => Some(Long),
        (Integer | Long, Double) | (Double, Integer | Long) => Some(Double),
        (integral @ (Integer | Long), Decimal(spec))
        | (Decimal(spec), integral @ (Integer | Long)) => {
            let widened = integral_as_decimal(integral)?;
            Some(merge_decimals(&widened, spec, max_precision))
        }
        _ => None,
    }
}

fn promote_incompatible(
    left: &SemanticType,
    right: &SemanticType,
    max_precision: u32,
) -> Option<SemanticType> {
    use SemanticType::*;

    match (left, right) {
        (Text, _) | (_, Text) => Some(Text),
        (Double, Decimal(_)) | (Decimal(_), Double) => Some(Double),
        (Decimal(a), Decimal(b)) => Some(merge_decimals(a, b, max_precision)),
        _ => None,
    }
}

fn integral_as_decimal(ty: &SemanticType) -> Option<DecimalSpec> {
    let precision = match ty {
        SemanticType::Integer => INTEGER_DECIMAL_DIGITS,
        SemanticType::Long => LONG_DECIMAL_DIGITS,
        _ => return None,
    };
    Some(DecimalSpec {
        precision,
        scale: 0,
    })
}

fn merge_decimals(a: &DecimalSpec, b: &DecimalSpec, max_precision: u32) -> SemanticType {
    let scale = a.scale.max(b.scale);
    let range = a.range().max(b.range());
    if range + scale > max_precision {
        SemanticType::Double
    } else {
        SemanticType::Decimal(DecimalSpec {
            precision: range + scale,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(precision: u32, scale: u32) -> SemanticType {
        SemanticType::Decimal(DecimalSpec::new(precision, scale).expect("valid decimal"))
    }

    #[test]
    fn null_is_identity_and_text_absorbs() {
        for ty in [
            SemanticType::Boolean,
            SemanticType::Integer,
            SemanticType::Long,
            dec(12, 3),
            SemanticType::Double,
            SemanticType::Timestamp,
            SemanticType::Text,
        ] {
            assert_eq!(join(&SemanticType::Null, &ty), ty);
            assert_eq!(join(&SemanticType::Text, &ty), SemanticType::Text);
        }
    }

    #[test]
    fn numeric_tower_widens() {
        assert_eq!(
            join(&SemanticType::Integer, &SemanticType::Long),
            SemanticType::Long
        );
        assert_eq!(
            join(&SemanticType::Long, &SemanticType::Double),
            SemanticType::Double
        );
        assert_eq!(join(&dec(5, 2), &SemanticType::Double), SemanticType::Double);
    }

    #[test]
    fn integral_meets_decimal_as_widened_decimal() {
        assert_eq!(join(&SemanticType::Integer, &dec(2, 1)), dec(11, 1));
        assert_eq!(join(&dec(25, 0), &SemanticType::Long), dec(25, 0));
        assert_eq!(join(&SemanticType::Long, &dec(3, 2)), dec(22, 2));
    }

    #[test]
    fn decimal_merge_keeps_range_and_scale() {
        assert_eq!(join(&dec(5, 2), &dec(7, 1)), dec(8, 2));
        assert_eq!(join(&dec(29, 0), &dec(10, 9)), dec(38, 9));
    }

    #[test]
    fn decimal_merge_past_cap_becomes_double() {
        assert_eq!(join(&dec(30, 0), &dec(10, 9)), SemanticType::Double);
        assert_eq!(join(&dec(38, 0), &dec(10, 9)), SemanticType::Double);
        assert_eq!(
            join_with_cap(&dec(10, 0), &dec(4, 4), 12),
            SemanticType::Double
        );
        assert_eq!(join_with_cap(&dec(8, 0), &dec(4, 4), 12), dec(12, 4));
    }

    #[test]
    fn unrelated_types_resolve_to_text() {
        assert_eq!(
            join(&SemanticType::Timestamp, &SemanticType::Integer),
            SemanticType::Text
        );
        assert_eq!(
            join(&SemanticType::Boolean, &dec(4, 0)),
            SemanticType::Text
        );
        assert_eq!(
            join(&SemanticType::Boolean, &SemanticType::Timestamp),
            SemanticType::Text
        );
    }

    #[test]
    fn type_tokens_round_trip_through_from_str() {
        assert_eq!(SemanticType::from_str("Decimal(18, 4)").unwrap(), dec(18, 4));
        assert_eq!(SemanticType::from_str("bigint").unwrap(), SemanticType::Long);
        assert_eq!(SemanticType::from_str("string").unwrap(), SemanticType::Text);
        assert_eq!(dec(18, 4).to_string(), "decimal(18,4)");
        assert!(SemanticType::from_str("decimal(40,2)").is_err());
        assert!(SemanticType::from_str("decimal(4)").is_err());
        assert!(SemanticType::from_str("uuid").is_err());
    }
}
