//! Delimited-text row source feeding the inference scan.
//!
//! - **Delimiter resolution**: `.tsv` inputs default to tab, everything else to
//!   comma, unless overridden.
//! - **Encoding**: fields are decoded with `encoding_rs`, defaulting to UTF-8.
//!   Fields that fail to decode become [`RawValue::Error`] cells and are counted.
//! - **stdin**: the `-` path reads from standard input.
//! - **Ragged rows**: the reader is flexible, so short and long records reach
//!   the scan as-is.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::value::{RawValue, Row};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn generate_field_names(count: usize) -> Vec<String> {
    (1..=count).map(|idx| format!("column_{idx}")).collect()
}

/// Iterator over the data rows of a delimited source.
pub struct CsvRowSource {
    reader: csv::Reader<Box<dyn Read>>,
    encoding: &'static Encoding,
    headers: Vec<String>,
    pending: Option<Row>,
    record: csv::ByteRecord,
    decode_errors: usize,
}

impl CsvRowSource {
    pub fn open(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
        has_headers: bool,
    ) -> Result<Self> {
        let reader: Box<dyn Read> = if is_dash(path) {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(BufReader::new(
                File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
            ))
        };
        Self::from_reader(reader, delimiter, encoding, has_headers)
    }

    pub fn from_reader(
        reader: Box<dyn Read>,
        delimiter: u8,
        encoding: &'static Encoding,
        has_headers: bool,
    ) -> Result<Self> {
        let mut source = Self {
            reader: open_csv_reader(reader, delimiter),
            encoding,
            headers: Vec::new(),
            pending: None,
            record: csv::ByteRecord::new(),
            decode_errors: 0,
        };
        if !source.read_next()? {
            return Ok(source);
        }
        if has_headers {
            source.headers = source
                .record
                .iter()
                .map(|field| decode_bytes(field, encoding))
                .collect::<Result<Vec<_>>>()
                .context("Decoding header row")?;
        } else {
            source.headers = generate_field_names(source.record.len());
            source.pending = Some(source.decode_current());
        }
        Ok(source)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn decode_errors(&self) -> usize {
        self.decode_errors
    }

    fn read_next(&mut self) -> Result<bool> {
        self.reader
            .read_byte_record(&mut self.record)
            .context("Reading CSV record")
    }

    fn decode_current(&mut self) -> Row {
        let mut row = Vec::with_capacity(self.record.len());
        for field in self.record.iter() {
            if field.is_empty() {
                row.push(RawValue::Blank);
                continue;
            }
            match decode_bytes(field, self.encoding) {
                Ok(text) => row.push(RawValue::Text(text)),
                Err(_) => {
                    self.decode_errors += 1;
                    row.push(RawValue::Error);
                }
            }
        }
        row
    }
}

impl Iterator for CsvRowSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }
        match self.read_next() {
            Ok(true) => Some(Ok(self.decode_current())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
