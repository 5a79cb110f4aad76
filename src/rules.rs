//! Per-dataset cleaning rules.
//!
//! Each public `clean_*` function sanitizes text columns first, then applies
//! its dataset's normalization and row filters. Filters only ever keep or
//! drop whole rows. A rule that cannot find one of its required columns logs
//! a warning and returns the input's columns with no rows.

use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::{
    data::Value,
    error::EtlError,
    schema::{ColumnMeta, ColumnType},
    table::{Row, Table},
    transform::{sanitize, string_ops},
};

pub const ZIP_PREFIX_WIDTH: usize = 5;
const ZIP_PREFIX_SUFFIX: &str = "_zip_code_prefix";
pub const STATE_WIDTH: usize = 2;

pub const ORDER_LIFECYCLE_COLUMNS: [&str; 5] = [
    "order_purchase_timestamp",
    "order_approved_at",
    "order_delivered_carrier_date",
    "order_delivered_customer_date",
    "order_estimated_delivery_date",
];

pub const REVIEW_COMMENT_COLUMNS: [&str; 2] = ["review_comment_title", "review_comment_message"];

pub const PRODUCT_COLUMN_RENAMES: [(&str, &str); 2] = [
    ("product_name_lenght", "product_name_length"),
    ("product_description_lenght", "product_description_length"),
];

pub const PRODUCT_DIMENSION_COLUMNS: [&str; 4] = [
    "product_weight_g",
    "product_length_cm",
    "product_height_cm",
    "product_width_cm",
];

type RuleResult = Result<Table, EtlError>;

fn guarded<F>(dataset: &str, table: &Table, rule: F) -> Table
where
    F: FnOnce(Table) -> RuleResult,
{
    match rule(sanitize(table)) {
        Ok(cleaned) => {
            debug!(
                "{dataset}: {} row(s) in, {} row(s) kept",
                table.height(),
                cleaned.height()
            );
            cleaned
        }
        Err(err) => {
            warn!("{dataset}: {err}; no rows kept");
            table.empty_like()
        }
    }
}

pub fn clean_geolocation(table: &Table) -> Table {
    guarded("geolocation", table, |table| {
        let table = normalize_zip_prefix(table, "geolocation_zip_code_prefix")?;
        let table = normalize_state(table, "geolocation_state")?;
        let table = keep_in_range(table, "geolocation_lat", -90.0, 90.0)?;
        let table = keep_in_range(table, "geolocation_lng", -180.0, 180.0)?;
        Ok(table.drop_duplicates(None))
    })
}

pub fn clean_customers(table: &Table) -> Table {
    guarded("customers", table, |table| {
        let id = table.require_column("customer_id")?;
        let unique_id = table.require_column("customer_unique_id")?;
        let table = table.drop_duplicates(Some(&[id, unique_id]));
        let table = normalize_zip_prefix(table, "customer_zip_code_prefix")?;
        normalize_state(table, "customer_state")
    })
}

pub fn clean_orders(table: &Table) -> Table {
    guarded("orders", table, |table| {
        let lifecycle = ORDER_LIFECYCLE_COLUMNS
            .iter()
            .map(|name| table.require_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let table = lifecycle
            .iter()
            .fold(table, |acc, &idx| parse_datetime_column(acc, idx));
        let table = table.filter(|row| non_decreasing(row, &lifecycle));
        Ok(table.drop_nulls())
    })
}

pub fn clean_order_reviews(table: &Table) -> Table {
    guarded("order_reviews", table, |table| {
        let table = keep_in_range(table, "review_score", 1.0, 5.0)?;
        let created = table.require_column("review_creation_date")?;
        let answered = table.require_column("review_answer_timestamp")?;
        let table = parse_datetime_column(table, created);
        let table = parse_datetime_column(table, answered);
        let table = table.filter(|row| non_decreasing(row, &[created, answered]));
        let review_id = table.require_column("review_id")?;
        Ok(table
            .drop_duplicates(Some(&[review_id]))
            .drop_columns(&REVIEW_COMMENT_COLUMNS))
    })
}

pub fn clean_order_payments(table: &Table) -> Table {
    guarded("order_payments", table, |table| {
        let installments = table.require_column("payment_installments")?;
        let value = table.require_column("payment_value")?;
        Ok(table.filter(|row| {
            numeric(row, installments).is_some_and(|n| n > 0.0)
                && numeric(row, value).is_some_and(|n| n > 0.0)
        }))
    })
}

pub fn clean_order_items(table: &Table) -> Table {
    guarded("order_items", table, |table| {
        let price = table.require_column("price")?;
        let freight = table.require_column("freight_value")?;
        let mut table = table.filter(|row| {
            numeric(row, price).is_some_and(|n| n > 0.0)
                && numeric(row, freight).is_some_and(|n| n >= 0.0)
        });
        let shipping_limit = match table.column_index("shipping_limit_date") {
            Some(idx) => idx,
            None => {
                table.push_column(
                    ColumnMeta::new("shipping_limit_date", ColumnType::DateTime),
                    Vec::new(),
                );
                table.width() - 1
            }
        };
        Ok(parse_datetime_column(table, shipping_limit))
    })
}

pub fn clean_product_categories(table: &Table) -> Table {
    guarded("product_categories", table, |table| {
        let name = table.require_column("product_category_name")?;
        let english = table.require_column("product_category_name_english")?;
        let table = trim_column(table, name);
        let table = trim_column(table, english);
        Ok(table.drop_duplicates(Some(&[english])))
    })
}

pub fn clean_products(table: &Table) -> Table {
    guarded("products", table, |table| {
        let mut table = PRODUCT_COLUMN_RENAMES
            .iter()
            .fold(table, |acc, (from, to)| acc.rename_column(from, to));
        for column in PRODUCT_DIMENSION_COLUMNS {
            let idx = table.require_column(column)?;
            table = table.filter(|row| numeric(row, idx).is_some_and(|n| n > 0.0));
        }
        Ok(table.drop_nulls())
    })
}

pub fn clean_sellers(table: &Table) -> Table {
    guarded("sellers", table, |table| {
        let table = normalize_zip_prefix(table, "seller_zip_code_prefix")?;
        normalize_state(table, "seller_state")
    })
}

fn numeric(row: &Row, column: usize) -> Option<f64> {
    row.get(column)?.as_ref()?.as_f64()
}

fn timestamp(row: &Row, column: usize) -> Option<NaiveDateTime> {
    match row.get(column)?.as_ref()? {
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

/// True when every listed timestamp is present and each is no earlier than
/// the one before it.
fn non_decreasing(row: &Row, columns: &[usize]) -> bool {
    let stamps: Option<Vec<NaiveDateTime>> =
        columns.iter().map(|&idx| timestamp(row, idx)).collect();
    stamps.is_some_and(|stamps| stamps.windows(2).all(|pair| pair[0] <= pair[1]))
}

/// Converts a column to timestamps; values that do not parse become null.
fn parse_datetime_column(table: Table, column: usize) -> Table {
    table.map_column(column, ColumnType::DateTime, |value| {
        value.and_then(Value::as_datetime).map(Value::DateTime)
    })
}

fn trim_column(table: Table, column: usize) -> Table {
    let datatype = table.column_type(column).unwrap_or(ColumnType::String);
    table.map_column(column, datatype, |value| match value {
        Some(Value::String(text)) => Some(Value::String(string_ops::trim(text).into_owned())),
        other => other.cloned(),
    })
}

/// Converts the zip prefix to text and keeps rows whose result is exactly
/// five characters. Numbers lost their leading zeros on load and are padded
/// back; text is kept as written.
fn normalize_zip_prefix(table: Table, name: &str) -> RuleResult {
    let idx = table.require_column(name)?;
    let table = table.map_column(idx, ColumnType::String, |value| {
        value.map(|v| Value::String(zip_prefix_text(v)))
    });
    Ok(table.filter(|row| text_len(row, idx) == Some(ZIP_PREFIX_WIDTH)))
}

fn zip_prefix_text(value: &Value) -> String {
    let numeric = match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.fract() == 0.0,
        _ => false,
    };
    let rendered = value.as_display();
    if numeric {
        string_ops::zero_pad(&rendered, ZIP_PREFIX_WIDTH).into_owned()
    } else {
        rendered
    }
}

/// Cleaned outputs store zip prefixes as text; reading them back must not
/// turn `01001` into a number.
pub fn is_zip_prefix_column(name: &str) -> bool {
    name.ends_with(ZIP_PREFIX_SUFFIX)
}

/// Uppercases and truncates the state code, keeping rows left with exactly
/// two characters.
fn normalize_state(table: Table, name: &str) -> RuleResult {
    let idx = table.require_column(name)?;
    let table = table.map_column(idx, ColumnType::String, |value| {
        value.map(|v| {
            let rendered = v.as_display();
            let truncated = string_ops::truncate_chars(&rendered, STATE_WIDTH);
            Value::String(string_ops::uppercase(&truncated).into_owned())
        })
    });
    Ok(table.filter(|row| text_len(row, idx) == Some(STATE_WIDTH)))
}

fn text_len(row: &Row, column: usize) -> Option<usize> {
    row.get(column)?
        .as_ref()?
        .as_str()
        .map(|text| text.chars().count())
}

fn keep_in_range(table: Table, name: &str, min: f64, max: f64) -> RuleResult {
    let idx = table.require_column(name)?;
    Ok(table.filter(|row| numeric(row, idx).is_some_and(|n| (min..=max).contains(&n))))
}
