//! Minimal RFC 4180 CSV reading and writing for tables.

use std::io::{Read, Write};

use crate::error::{Result, TableError};
use crate::table::{Column, Table};
use crate::value::Value;

/// Write `table` with a header line of column names.
pub fn write_csv<W: Write>(table: &Table, writer: &mut W) -> Result<()> {
    let header: Vec<String> = table.column_names().map(quote).collect();
    writeln!(writer, "{}", header.join(","))?;
    for row in 0..table.row_count() {
        let cells: Vec<String> = table.row(row).map(|(_, v)| quote(&v.to_string())).collect();
        writeln!(writer, "{}", cells.join(","))?;
    }
    Ok(())
}

/// Read a table written by [`write_csv`] or any CSV with a header line.
/// Cells are parsed as integers, then floats, otherwise kept as text.
pub fn read_csv<R: Read>(reader: &mut R) -> Result<Table> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let records = parse_records(&text)?;

    let mut records = records.into_iter();
    let Some((_, header)) = records.next() else {
        return Ok(Table::new());
    };

    let mut columns: Vec<Column> = header
        .into_iter()
        .map(|name| Column {
            name,
            values: Vec::new(),
        })
        .collect();
    let mut rows = 0;
    for (line, record) in records {
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != columns.len() {
            return Err(TableError::Csv {
                line,
                detail: format!("expected {} fields, found {}", columns.len(), record.len()),
            });
        }
        for (column, cell) in columns.iter_mut().zip(record) {
            column.values.push(Value::parse(&cell));
        }
        rows += 1;
    }
    Table::from_columns(rows, columns)
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split `text` into records, returning each with its starting line number.
fn parse_records(text: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(TableError::Csv {
            line: record_line,
            detail: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let mut t = Table::new();
        t.push_row([("mr", Value::Int(2)), ("eff", Value::Float(0.5))]);
        t.push_row([("mr", Value::Int(4)), ("eff", Value::Float(0.75))]);
        let mut out = Vec::new();
        write_csv(&t, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "mr,eff\n2,0.5\n4,0.75\n");
    }

    #[test]
    fn reads_back_typed_cells() {
        let mut t = Table::new();
        t.push_row([("isa", Value::from("aarch64")), ("n", Value::Int(7)), ("x", Value::Float(1.25))]);
        let mut out = Vec::new();
        write_csv(&t, &mut out).unwrap();
        let back = read_csv(&mut out.as_slice()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn quoting() {
        let mut t = Table::new();
        t.push_row([("label", Value::from("a,\"b\""))]);
        let mut out = Vec::new();
        write_csv(&t, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "label\n\"a,\"\"b\"\"\"\n");
        let back = read_csv(&mut out.as_slice()).unwrap();
        assert_eq!(back.value(0, "label"), Some(&Value::from("a,\"b\"")));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = read_csv(&mut "a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Csv { line: 3, .. }));
    }

    #[test]
    fn empty_input() {
        assert_eq!(read_csv(&mut "".as_bytes()).unwrap().column_count(), 0);
    }
}
