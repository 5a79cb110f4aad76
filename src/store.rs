//! Storage seam between the pipeline and the filesystem.
//!
//! The orchestrator only speaks [`TableStore`], which keeps it free of paths
//! and CSV details and lets tests substitute an in-memory store.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;

use crate::{io_utils, rules, table::Table};

pub trait TableStore {
    /// Loads a raw input dataset. `Ok(None)` means the file does not exist.
    fn load_input(&self, file_name: &str) -> Result<Option<Table>>;

    /// Persists a table under the output location, replacing any previous file.
    fn write_output(&mut self, file_name: &str, table: &Table) -> Result<()>;

    /// Output file names starting with `prefix`, sorted.
    fn list_outputs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Loads a previously written output file. `Ok(None)` means it is absent.
    fn load_output(&self, file_name: &str) -> Result<Option<Table>>;
}

/// CSV files under an input and an output directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
}

impl CsvStore {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        delimiter: Option<u8>,
        encoding: &'static Encoding,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            delimiter,
            encoding,
        }
    }

    fn read(
        &self,
        path: PathBuf,
        encoding: &'static Encoding,
        keep_text: fn(&str) -> bool,
    ) -> Result<Option<Table>> {
        if !path.is_file() {
            return Ok(None);
        }
        let delimiter = io_utils::resolve_input_delimiter(&path, self.delimiter);
        let (headers, rows) = io_utils::read_records(&path, delimiter, encoding)?;
        Ok(Some(Table::from_text_keeping(&headers, rows, keep_text)))
    }
}

impl TableStore for CsvStore {
    fn load_input(&self, file_name: &str) -> Result<Option<Table>> {
        self.read(self.input_dir.join(file_name), self.encoding, |_| false)
    }

    fn write_output(&mut self, file_name: &str, table: &Table) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Creating output directory {:?}", self.output_dir))?;
        let path = self.output_dir.join(file_name);
        let delimiter = io_utils::resolve_input_delimiter(&path, self.delimiter);
        io_utils::write_table(&path, table, delimiter)
    }

    fn list_outputs(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.output_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.output_dir)
            .with_context(|| format!("Listing output directory {:?}", self.output_dir))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("Listing {:?}", self.output_dir))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && name.starts_with(prefix)
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_output(&self, file_name: &str) -> Result<Option<Table>> {
        // Outputs are always written as UTF-8. Padded zip prefixes must keep
        // their leading zeros.
        self.read(
            self.output_dir.join(file_name),
            encoding_rs::UTF_8,
            rules::is_zip_prefix_column,
        )
    }
}
