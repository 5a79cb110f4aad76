//! Plain-text tables for terminal reports.

use std::{borrow::Cow, fmt::Write as _};

const COLUMN_GAP: &str = "  ";
const MIN_RULE_WIDTH: usize = 3;

/// Renders `rows` under `headers` as left-aligned columns with a dashed rule
/// below the header line. Cells beyond the header count are ignored.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h).max(1)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell_width(cell));
        }
    }

    let rule_widths: Vec<usize> = widths.iter().map(|w| (*w).max(MIN_RULE_WIDTH)).collect();
    let rule: Vec<String> = rule_widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut output = String::new();
    let _ = writeln!(output, "{}", render_line(headers, &widths));
    let _ = writeln!(output, "{}", render_line(&rule, &rule_widths));
    for row in rows {
        let _ = writeln!(output, "{}", render_line(row, &widths));
    }
    output
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let flat = flatten(cell);
            let padding = width.saturating_sub(cell_width(&flat));
            format!("{flat}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

// Line breaks and tabs would tear the grid apart.
fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
