//! Raw cell values as handed over by a row source.
//!
//! A [`RawValue`] carries exactly what the upstream reader knows about a cell and
//! nothing more: spreadsheet readers can tell a date-formatted number from a
//! plain one, and a formula cell only exposes the kind of its cached result.

use std::fmt;

/// Kind of the last cached result of a formula cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    Text,
    Numeric,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Blank,
    Error,
    Unsupported,
    Boolean(bool),
    Numeric { value: f64, date_formatted: bool },
    Text(String),
    Formula(FormulaKind),
}

/// One source row, positionally aligned with the header.
pub type Row = Vec<RawValue>;

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        RawValue::Numeric {
            value,
            date_formatted: false,
        }
    }

    pub fn date_serial(value: f64) -> Self {
        RawValue::Numeric {
            value,
            date_formatted: true,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            RawValue::Blank => String::new(),
            RawValue::Error => "#ERROR".to_string(),
            RawValue::Unsupported => "#UNSUPPORTED".to_string(),
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Numeric { value, .. } => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    (*value as i64).to_string()
                } else {
                    value.to_string()
                }
            }
            RawValue::Text(s) => s.clone(),
            RawValue::Formula(kind) => format!("={kind:?}"),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            RawValue::Blank
        } else {
            RawValue::Text(value.to_string())
        }
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            RawValue::Blank
        } else {
            RawValue::Text(value)
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::number(value)
    }
}
