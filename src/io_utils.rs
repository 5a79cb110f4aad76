//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in olist-etl flows through this module:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//!   Output is always UTF-8.
//! - **Whole-table reads and writes**: datasets are small enough to be
//!   materialized, so [`read_table`] and [`write_table`] move complete
//!   [`Table`] values in and out of files.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::table::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

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
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let file: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(file))
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

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Headers and decoded text rows of a CSV source.
pub type RawRecords = (Vec<String>, Vec<Vec<String>>);

/// Reads every row of a CSV file into a typed table.
pub fn read_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let (headers, rows) = read_records(path, delimiter, encoding)?;
    Ok(Table::from_text(&headers, rows))
}

pub fn read_table_from<R>(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Table>
where
    R: Read,
{
    let (headers, rows) = read_records_from(reader, delimiter, encoding)?;
    Ok(Table::from_text(&headers, rows))
}

pub fn read_records(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<RawRecords> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_records_from(BufReader::new(file), delimiter, encoding)
        .with_context(|| format!("Reading {path:?}"))
}

pub fn read_records_from<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawRecords>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let headers = reader_headers(&mut reader, encoding)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        rows.push(
            decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?,
        );
    }
    Ok((headers, rows))
}

pub fn write_table(path: &Path, table: &Table, delimiter: u8) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers())
        .context("Writing headers")?;
    for (row_idx, row) in table.display_rows().enumerate() {
        writer
            .write_record(&row)
            .with_context(|| format!("Writing row {}", row_idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, schema::ColumnType};

    #[test]
    fn resolve_input_delimiter_uses_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn read_table_from_decodes_latin1_input() {
        let encoding = resolve_encoding(Some("latin1")).unwrap();
        let bytes: &[u8] = b"city,zip\nS\xe3o Paulo,1001\n";
        let table = read_table_from(bytes, b',', encoding).unwrap();
        assert_eq!(table.value(0, 0), Some(&Value::String("São Paulo".into())));
        assert_eq!(table.column_type(1), Some(ColumnType::Integer));
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(resolve_encoding(Some("klingon")).is_err());
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
    }
}
