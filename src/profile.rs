//! Data-quality profile of a folder of CSV files.
//!
//! For every column the profiler counts nulls; for text columns it also
//! counts the rows holding characters the sanitizer would strip and lists
//! those characters. Each file additionally reports its full-row duplicates.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};
use serde::Serialize;

use crate::{
    data::Value,
    io_utils,
    report,
    schema::ColumnType,
    table::Table,
    transform::sanitize,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub datatype: ColumnType,
    pub nulls: usize,
    /// Only reported for text columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_with_unwanted_chars: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unwanted_chars: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileProfile {
    pub file_name: String,
    pub rows: usize,
    pub duplicate_rows: usize,
    pub columns: Vec<ColumnProfile>,
}

pub fn profile_table(file_name: &str, table: &Table) -> FileProfile {
    let columns = table
        .schema()
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let nulls = table.column_values(idx).filter(Option::is_none).count();
            let (rows_with_unwanted_chars, unwanted_chars) = if column.datatype.is_text() {
                let mut rows = 0usize;
                let mut chars = std::collections::BTreeSet::new();
                for text in table.column_values(idx).flatten().filter_map(Value::as_str) {
                    let found = sanitize::disallowed_chars(text);
                    if !found.is_empty() {
                        rows += 1;
                        chars.extend(found);
                    }
                }
                (Some(rows), chars.into_iter().collect())
            } else {
                (None, Vec::new())
            };
            ColumnProfile {
                name: column.name.clone(),
                datatype: column.datatype,
                nulls,
                rows_with_unwanted_chars,
                unwanted_chars,
            }
        })
        .collect();

    let distinct = table.clone().drop_duplicates(None).height();
    FileProfile {
        file_name: file_name.to_string(),
        rows: table.height(),
        duplicate_rows: table.height() - distinct,
        columns,
    }
}

/// Profiles every `.csv` file directly inside `dir`, in file-name order.
/// Files that cannot be read are logged and left out.
pub fn profile_folder(
    dir: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Vec<FileProfile>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Listing {dir:?}"))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Listing {dir:?}"))?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            paths.push(path);
        }
    }
    paths.sort();

    let mut profiles = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let delimiter = io_utils::resolve_input_delimiter(&path, delimiter);
        match io_utils::read_table(&path, delimiter, encoding) {
            Ok(table) => {
                info!("Profiled {file_name}: {} row(s)", table.height());
                profiles.push(profile_table(&file_name, &table));
            }
            Err(err) => warn!("Skipping {file_name}: {err:#}"),
        }
    }
    Ok(profiles)
}

pub fn render_text(profiles: &[FileProfile]) -> String {
    let headers: Vec<String> = ["column", "type", "nulls", "unwanted rows", "unwanted chars"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut output = String::new();
    for profile in profiles {
        output.push_str(&format!(
            "{} ({} row(s), {} duplicate row(s))\n",
            profile.file_name, profile.rows, profile.duplicate_rows
        ));
        let rows: Vec<Vec<String>> = profile
            .columns
            .iter()
            .map(|column| {
                vec![
                    column.name.clone(),
                    column.datatype.to_string(),
                    column.nulls.to_string(),
                    column
                        .rows_with_unwanted_chars
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    column.unwanted_chars.iter().collect(),
                ]
            })
            .collect();
        output.push_str(&report::render_table(&headers, &rows));
        output.push('\n');
    }
    output
}

pub fn render_json(profiles: &[FileProfile]) -> Result<String> {
    serde_json::to_string_pretty(profiles).context("Serializing profile report")
}
