//! Row fold, accumulator merge and schema finalization.
//!
//! A scan starts from an all-`Null` accumulator with one slot per header column,
//! folds every row into it with [`infer_row`], and hands the result to
//! [`finalize`]. Accumulators built over disjoint row ranges combine with
//! [`merge_columns`] in any order, which is what [`infer_parallel`] relies on.

use itertools::{EitherOrBoth, Itertools};
use log::debug;

use crate::{
    classify::classify,
    options::InferOptions,
    schema::Schema,
    types::{SemanticType, join_with_cap},
    value::{FormulaKind, RawValue},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    rows_scanned: usize,
    columns: usize,
}

impl ScanStats {
    pub fn new(rows_scanned: usize, columns: usize) -> Self {
        Self {
            rows_scanned,
            columns,
        }
    }

    pub fn rows_scanned(&self) -> usize {
        self.rows_scanned
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// Fresh accumulator for a header of `width` columns.
pub fn empty_accumulator(width: usize) -> Vec<SemanticType> {
    vec![SemanticType::Null; width]
}

/// Type observed for a single cell, before joining with the column so far.
pub fn raw_value_type(
    value: &RawValue,
    so_far: &SemanticType,
    options: &InferOptions,
) -> SemanticType {
    match value {
        RawValue::Blank | RawValue::Error | RawValue::Unsupported => SemanticType::Null,
        RawValue::Boolean(_) => SemanticType::Boolean,
        RawValue::Numeric { date_formatted, .. } => {
            if *date_formatted {
                SemanticType::Timestamp
            } else {
                SemanticType::Double
            }
        }
        RawValue::Formula(FormulaKind::Text) => SemanticType::Text,
        RawValue::Formula(FormulaKind::Numeric) => SemanticType::Double,
        RawValue::Formula(FormulaKind::Unknown) => SemanticType::Null,
        RawValue::Text(text) => classify(text, so_far, options),
    }
}

/// Folds one row into the accumulator. Missing trailing cells leave their
/// column unchanged and cells past the header width are ignored.
pub fn infer_row(
    types_so_far: &[SemanticType],
    row: &[RawValue],
    options: &InferOptions,
) -> Vec<SemanticType> {
    types_so_far
        .iter()
        .enumerate()
        .map(|(idx, so_far)| {
            let observed = row
                .get(idx)
                .map(|value| raw_value_type(value, so_far, options))
                .unwrap_or(SemanticType::Null);
            join_with_cap(so_far, &observed, options.max_precision)
        })
        .collect()
}

/// Element-wise join of two accumulators; the shorter one is padded with `Null`.
pub fn merge_columns(
    left: &[SemanticType],
    right: &[SemanticType],
    options: &InferOptions,
) -> Vec<SemanticType> {
    left.iter()
        .zip_longest(right.iter())
        .map(|pair| match pair {
            EitherOrBoth::Both(l, r) => join_with_cap(l, r, options.max_precision),
            EitherOrBoth::Left(only) | EitherOrBoth::Right(only) => {
                join_with_cap(only, &SemanticType::Null, options.max_precision)
            }
        })
        .collect()
}

/// Pairs header names with their resolved types. Columns that never saw a
/// value become `Text`.
pub fn finalize(types: &[SemanticType], header: &[String]) -> Schema {
    let resolved = header.iter().enumerate().map(|(idx, name)| {
        let datatype = match types.get(idx) {
            None | Some(SemanticType::Null) => SemanticType::Text,
            Some(ty) => *ty,
        };
        (name.clone(), datatype)
    });
    Schema::from_pairs(resolved)
}

/// Infers a schema from a sequence of rows.
pub fn infer<I, R>(rows: I, header: &[String], options: &InferOptions) -> Schema
where
    I: IntoIterator<Item = R>,
    R: AsRef<[RawValue]>,
{
    infer_with_stats(rows, header, options).0
}

pub fn infer_with_stats<I, R>(
    rows: I,
    header: &[String],
    options: &InferOptions,
) -> (Schema, ScanStats)
where
    I: IntoIterator<Item = R>,
    R: AsRef<[RawValue]>,
{
    match try_infer_with_stats(
        rows.into_iter().map(Ok::<R, std::convert::Infallible>),
        header,
        options,
    ) {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

/// Infers a schema from a fallible row source, stopping at the first error.
pub fn try_infer_with_stats<I, R, E>(
    rows: I,
    header: &[String],
    options: &InferOptions,
) -> Result<(Schema, ScanStats), E>
where
    I: IntoIterator<Item = Result<R, E>>,
    R: AsRef<[RawValue]>,
{
    let mut stats = ScanStats::new(0, header.len());
    if !options.infer_schema {
        debug!(
            "Schema inference disabled; assigning text to {} column(s)",
            header.len()
        );
        return Ok((Schema::all_text(header), stats));
    }

    let limit = match options.sample_rows {
        0 => usize::MAX,
        n => n,
    };
    let mut types = empty_accumulator(header.len());
    for row in rows.into_iter().take(limit) {
        let row = row?;
        types = infer_row(&types, row.as_ref(), options);
        stats.rows_scanned += 1;
    }
    debug!(
        "Scanned {} row(s) across {} column(s)",
        stats.rows_scanned,
        header.len()
    );
    Ok((finalize(&types, header), stats))
}

/// Infers a schema by folding disjoint row ranges on the rayon pool and
/// merging the partial accumulators.
#[cfg(feature = "parallel")]
pub fn infer_parallel<R>(rows: &[R], header: &[String], options: &InferOptions) -> Schema
where
    R: AsRef<[RawValue]> + Sync,
{
    use rayon::prelude::*;

    if !options.infer_schema {
        return Schema::all_text(header);
    }
    let rows = match options.sample_rows {
        0 => rows,
        n => &rows[..n.min(rows.len())],
    };
    let width = header.len();
    let types = rows
        .par_iter()
        .fold(
            || empty_accumulator(width),
            |acc, row| infer_row(&acc, row.as_ref(), options),
        )
        .reduce(
            || empty_accumulator(width),
            |left, right| merge_columns(&left, &right, options),
        );
    debug!(
        "Scanned {} row(s) across {} column(s) in parallel",
        rows.len(),
        width
    );
    finalize(&types, header)
}
