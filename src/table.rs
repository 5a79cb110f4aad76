//! In-memory typed table.
//!
//! A [`Table`] owns a [`Schema`] and row-major cells. Every operation that
//! changes rows or columns consumes the table and returns the new value, so a
//! cleaning rule that borrows its input can never alter the caller's copy.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    data::{Value, parse_typed_value},
    error::EtlError,
    schema::{self, ColumnMeta, ColumnType, Schema},
};

pub type Row = Vec<Option<Value>>;

const KEY_SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table from decoded CSV text, inferring column types. A field
    /// that fails to parse as its column's type becomes null.
    pub fn from_text(headers: &[String], raw_rows: Vec<Vec<String>>) -> Self {
        Self::from_text_keeping(headers, raw_rows, |_| false)
    }

    /// [`Table::from_text`] with the columns named by `keep_text` left as text.
    pub fn from_text_keeping(
        headers: &[String],
        raw_rows: Vec<Vec<String>>,
        keep_text: impl Fn(&str) -> bool,
    ) -> Self {
        let schema = schema::infer_schema_keeping_text(headers, &raw_rows, keep_text);
        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                schema
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| {
                        let value = raw.get(idx).map(|s| s.as_str()).unwrap_or("");
                        parse_typed_value(value, &column.datatype).unwrap_or(None)
                    })
                    .collect()
            })
            .collect();
        Self { schema, rows }
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.schema.headers()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name)
    }

    pub fn column_type(&self, idx: usize) -> Option<ColumnType> {
        self.schema.columns.get(idx).map(|c| c.datatype)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, EtlError> {
        self.column_index(name)
            .ok_or_else(|| EtlError::UnknownColumn {
                column: name.to_string(),
                available: self.schema.headers().join(", "),
            })
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Values of one column in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(|v| v.as_ref()))
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn filter<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }

    /// Rewrites every cell of one column and assigns the column a new type.
    pub fn map_column<F>(mut self, column: usize, datatype: ColumnType, mut map: F) -> Self
    where
        F: FnMut(Option<&Value>) -> Option<Value>,
    {
        if let Some(meta) = self.schema.columns.get_mut(column) {
            meta.datatype = datatype;
        }
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = map(cell.as_ref());
            }
        }
        self
    }

    /// Renames `from` to `to`. A table without `from` is returned unchanged.
    pub fn rename_column(mut self, from: &str, to: &str) -> Self {
        if let Some(idx) = self.schema.column_index(from) {
            self.schema.columns[idx].name = to.to_string();
        }
        self
    }

    /// Removes the named columns; names that are absent are ignored.
    pub fn drop_columns(mut self, names: &[&str]) -> Self {
        let doomed: HashSet<usize> = names
            .iter()
            .filter_map(|name| self.schema.column_index(name))
            .collect();
        if doomed.is_empty() {
            return self;
        }
        self.schema.columns = std::mem::take(&mut self.schema.columns)
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !doomed.contains(idx))
            .map(|(_, column)| column)
            .collect();
        for row in &mut self.rows {
            *row = std::mem::take(row)
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| !doomed.contains(idx))
                .map(|(_, cell)| cell)
                .collect();
        }
        self
    }

    /// Drops later rows whose values in `subset` equal an earlier row's.
    /// `None` compares every column. Nulls compare equal to each other.
    pub fn drop_duplicates(self, subset: Option<&[usize]>) -> Self {
        let all_columns = (0..self.width()).collect_vec();
        let columns = subset.unwrap_or(&all_columns).to_vec();
        let mut seen = HashSet::new();
        self.filter(|row| seen.insert(row_key(row, &columns)))
    }

    /// Drops every row holding a null in any column.
    pub fn drop_nulls(self) -> Self {
        self.filter(|row| row.iter().all(Option::is_some))
    }

    pub fn push_column(&mut self, meta: ColumnMeta, values: Vec<Option<Value>>) {
        self.schema.columns.push(meta);
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().flatten());
        }
    }

    /// Cell text for CSV output; nulls render as empty fields.
    pub fn display_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                .collect()
        })
    }
}

/// Hashable identity of a row restricted to `columns`.
pub fn row_key(row: &Row, columns: &[usize]) -> String {
    columns
        .iter()
        .map(|idx| match row.get(*idx).and_then(|v| v.as_ref()) {
            Some(value) => format!("v{}", value.as_display()),
            None => "n".to_string(),
        })
        .join(KEY_SEPARATOR)
}
