//! Pairwise referential reconciliation.
//!
//! [`reconcile`] restricts two tables to the rows whose join key appears on
//! both sides. Keys compare by their rendered text, so an integer `2` and a
//! float `2.0` match; null keys never match.

use std::collections::HashSet;

use crate::{error::Result, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSpec {
    pub left_key: &'static str,
    pub right_key: &'static str,
}

impl JoinSpec {
    /// Both tables carry the key under the same column name.
    pub const fn shared(key: &'static str) -> Self {
        Self {
            left_key: key,
            right_key: key,
        }
    }

    /// The key is named differently on each side.
    pub const fn pair(left_key: &'static str, right_key: &'static str) -> Self {
        Self {
            left_key,
            right_key,
        }
    }
}

/// Row counts before and after one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub left_before: usize,
    pub left_after: usize,
    pub right_before: usize,
    pub right_after: usize,
}

impl ReconcileStats {
    pub fn left_removed(&self) -> usize {
        self.left_before - self.left_after
    }

    pub fn right_removed(&self) -> usize {
        self.right_before - self.right_after
    }

    pub fn changed(&self) -> bool {
        self.left_removed() > 0 || self.right_removed() > 0
    }
}

fn key_set(table: &Table, column: usize) -> HashSet<String> {
    table
        .column_values(column)
        .flatten()
        .map(|value| value.as_display())
        .collect()
}

fn restrict(table: &Table, column: usize, keys: &HashSet<&String>) -> Table {
    table.clone().filter(|row| {
        row.get(column)
            .and_then(|cell| cell.as_ref())
            .is_some_and(|value| keys.contains(&value.as_display()))
    })
}

/// Filters both tables to the intersection of their key values, preserving
/// row order. Fails only when a key column is missing.
pub fn reconcile(
    left: &Table,
    right: &Table,
    join: &JoinSpec,
) -> Result<(Table, Table)> {
    let left_idx = left.require_column(join.left_key)?;
    let right_idx = right.require_column(join.right_key)?;

    let left_keys = key_set(left, left_idx);
    let right_keys = key_set(right, right_idx);
    let common: HashSet<&String> = left_keys.intersection(&right_keys).collect();

    Ok((
        restrict(left, left_idx, &common),
        restrict(right, right_idx, &common),
    ))
}

pub fn stats(before: (&Table, &Table), after: (&Table, &Table)) -> ReconcileStats {
    ReconcileStats {
        left_before: before.0.height(),
        left_after: after.0.height(),
        right_before: before.1.height(),
        right_after: after.1.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, error::EtlError};

    fn keyed(name: &str, keys: &[&str]) -> Table {
        let headers = vec![name.to_string(), "payload".to_string()];
        let rows = keys
            .iter()
            .enumerate()
            .map(|(idx, key)| vec![key.to_string(), format!("row{idx}")])
            .collect();
        Table::from_text(&headers, rows)
    }

    fn keys(table: &Table, column: usize) -> Vec<String> {
        table
            .column_values(column)
            .map(|v| v.map(Value::as_display).unwrap_or_default())
            .collect()
    }

    #[test]
    fn reconcile_keeps_only_shared_keys() {
        let orders = keyed("order_id", &["1", "2", "3"]);
        let payments = keyed("order_id", &["2", "3", "4"]);
        let (orders, payments) =
            reconcile(&orders, &payments, &JoinSpec::shared("order_id")).unwrap();
        assert_eq!(keys(&orders, 0), vec!["2", "3"]);
        assert_eq!(keys(&payments, 0), vec!["2", "3"]);
    }

    #[test]
    fn reconcile_preserves_order_and_duplicates() {
        let left = keyed("zip", &["b", "a", "b", "c"]);
        let right = keyed("geo_zip", &["a", "b", "a"]);
        let (left, right) = reconcile(&left, &right, &JoinSpec::pair("zip", "geo_zip")).unwrap();
        assert_eq!(keys(&left, 0), vec!["b", "a", "b"]);
        assert_eq!(keys(&right, 0), vec!["a", "b", "a"]);
        assert_eq!(left.value(2, 1), Some(&Value::String("row2".into())));
    }

    #[test]
    fn reconcile_never_matches_null_keys() {
        let left = keyed("id", &["", "1"]);
        let right = keyed("id", &["", "1"]);
        let (left, right) = reconcile(&left, &right, &JoinSpec::shared("id")).unwrap();
        assert_eq!(left.height(), 1);
        assert_eq!(right.height(), 1);
    }

    #[test]
    fn reconcile_reports_missing_key_column() {
        let left = keyed("id", &["1"]);
        let right = keyed("other", &["1"]);
        let err = reconcile(&left, &right, &JoinSpec::shared("id")).expect_err("missing key");
        assert!(matches!(err, EtlError::UnknownColumn { ref column, .. } if column == "id"));
    }

    #[test]
    fn stats_count_removed_rows() {
        let left = keyed("id", &["1", "2"]);
        let right = keyed("id", &["2"]);
        let (l, r) = reconcile(&left, &right, &JoinSpec::shared("id")).unwrap();
        let summary = stats((&left, &right), (&l, &r));
        assert_eq!(summary.left_removed(), 1);
        assert_eq!(summary.right_removed(), 0);
        assert!(summary.changed());
    }
}
