//! Character-level cleanup of text columns.
//!
//! Every character outside ASCII letters, ASCII digits, whitespace, and
//! `, . : " - _` is deleted outright; surrounding characters close up.

use std::{borrow::Cow, collections::BTreeSet, sync::OnceLock};

use regex::Regex;

use crate::{data::Value, table::Table, transform::string_ops};

static DISALLOWED: OnceLock<Regex> = OnceLock::new();

fn disallowed() -> &'static Regex {
    DISALLOWED.get_or_init(|| {
        Regex::new(r#"[^a-zA-Z0-9\s,.:"_\-]"#).expect("sanitizer pattern is valid")
    })
}

/// Removes disallowed characters from a single value.
pub fn strip_disallowed(value: &str) -> Cow<'_, str> {
    string_ops::regex_replace(value, disallowed(), "")
}

/// Distinct disallowed characters present in `value`.
pub fn disallowed_chars(value: &str) -> BTreeSet<char> {
    disallowed()
        .find_iter(value)
        .flat_map(|m| m.as_str().chars())
        .collect()
}

pub fn contains_disallowed(value: &str) -> bool {
    disallowed().is_match(value)
}

/// Sanitizes every text column of `table`. Other column types and nulls are
/// left as they are.
pub fn sanitize(table: &Table) -> Table {
    let text_columns: Vec<usize> = table
        .schema()
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.datatype.is_text())
        .map(|(idx, _)| idx)
        .collect();

    text_columns
        .into_iter()
        .fold(table.clone(), |acc, idx| {
            let datatype = table.schema().columns[idx].datatype;
            acc.map_column(idx, datatype, |value| match value {
                Some(Value::String(text)) => {
                    Some(Value::String(strip_disallowed(text).into_owned()))
                }
                other => other.cloned(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn strip_disallowed_deletes_without_placeholder() {
        assert_eq!(strip_disallowed("São Paulo!"), "So Paulo");
        assert_eq!(strip_disallowed("a;b'c"), "abc");
        assert_eq!(
            strip_disallowed("ok: \"quoted\", 1.5 - x_y"),
            "ok: \"quoted\", 1.5 - x_y"
        );
    }

    #[test]
    fn strip_disallowed_keeps_unicode_whitespace() {
        assert_eq!(strip_disallowed("a\tb\nc"), "a\tb\nc");
        assert_eq!(strip_disallowed("sao\u{00A0}paulo\u{2003}"), "sao\u{00A0}paulo\u{2003}");
        assert!(!contains_disallowed("a\u{00A0}b"));
    }

    #[test]
    fn disallowed_chars_collects_distinct_offenders() {
        let found = disallowed_chars("a#b#c@");
        assert_eq!(found.into_iter().collect::<String>(), "#@");
        assert!(!contains_disallowed("plain text"));
    }

    #[test]
    fn sanitize_touches_only_text_columns() {
        let headers = vec!["id".to_string(), "city".to_string()];
        let table = Table::from_text(
            &headers,
            vec![
                vec!["7".into(), "belém".into()],
                vec!["8".into(), "".into()],
            ],
        );
        let cleaned = sanitize(&table);
        assert_eq!(cleaned.column_type(0), Some(ColumnType::Integer));
        assert_eq!(cleaned.value(0, 0), Some(&Value::Integer(7)));
        assert_eq!(cleaned.value(0, 1), Some(&Value::String("belm".into())));
        assert_eq!(cleaned.value(1, 1), None);
        assert_eq!(table.value(0, 1), Some(&Value::String("belém".into())));
    }
}
