//! Column typing for in-memory tables.
//!
//! A [`Schema`] is the ordered list of [`ColumnMeta`] entries carried by every
//! table. Types are either inferred from raw CSV text on load (the same way a
//! CSV reader settles on integer, float, or text) or assigned explicitly by a
//! cleaning rule, e.g. when a text column is parsed into timestamps.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    DateTime,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Integer => "Integer",
            ColumnType::Float => "Float",
            ColumnType::DateTime => "DateTime",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::String)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
        }
    }

    fn observe(&mut self, value: &str) {
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else {
            ColumnType::String
        }
    }
}

/// Infers a schema from raw text rows. Empty fields are ignored; a column
/// with no non-empty values stays text.
pub fn infer_schema(headers: &[String], rows: &[Vec<String>]) -> Schema {
    infer_schema_keeping_text(headers, rows, |_| false)
}

/// Like [`infer_schema`], but columns named by `keep_text` stay text whatever
/// their values look like.
pub fn infer_schema_keeping_text(
    headers: &[String],
    rows: &[Vec<String>],
    keep_text: impl Fn(&str) -> bool,
) -> Schema {
    let mut candidates = vec![TypeCandidate::new(); headers.len()];
    let mut observed = vec![false; headers.len()];
    for row in rows {
        for (idx, field) in row.iter().enumerate().take(headers.len()) {
            if field.is_empty() {
                continue;
            }
            observed[idx] = true;
            candidates[idx].observe(field);
        }
    }
    let columns = headers
        .iter()
        .zip(candidates.iter().zip(observed))
        .map(|(name, (candidate, seen))| {
            let datatype = if seen && !keep_text(name.as_str()) {
                candidate.decide()
            } else {
                ColumnType::String
            };
            ColumnMeta::new(name.clone(), datatype)
        })
        .collect();
    Schema { columns }
}
