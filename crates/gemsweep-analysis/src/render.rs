//! Plain-text rendering of tables for the terminal.

use std::fmt::Write;

use gemsweep_table::{Table, Value};

/// Floats are printed with this many decimals.
const FLOAT_PRECISION: usize = 4;

fn cell(value: &Value) -> String {
    match value {
        Value::Float(f) if f.is_finite() && f.fract() != 0.0 => format!("{f:.prec$}", prec = FLOAT_PRECISION),
        other => other.to_string(),
    }
}

/// Render `table` with a header row and space-aligned columns. Numbers are
/// right-aligned, text left-aligned.
pub fn render_table(table: &Table) -> String {
    let columns = table.columns();
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| c.values.iter().map(cell).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .zip(&cells)
        .map(|(c, values)| values.iter().map(String::len).chain([c.name.len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, &w)| format!("{:<w$}", c.name))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());

    for row in 0..table.row_count() {
        let line: Vec<String> = columns
            .iter()
            .zip(&cells)
            .zip(&widths)
            .map(|((c, values), &w)| match c.values[row] {
                Value::Text(_) => format!("{:<w$}", values[row]),
                _ => format!("{:>w$}", values[row]),
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}
