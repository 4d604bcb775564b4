use serde_json::Value;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const DEFAULT_MAX_ROWS: usize = 20;
pub const DEFAULT_MAX_COL_WIDTH: usize = 32;

const ELLIPSIS: char = '…';
const INDEX_HEADER: &str = "#";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("--headers_json or --headers_file must be a non-empty JSON string array")]
    InvalidHeaders,
    #[error("All table headers must be strings")]
    NonStringHeader,
    #[error("--rows_json or --rows_file must be a JSON array")]
    InvalidRows,
    #[error("Rows must be arrays or objects")]
    InvalidRow,
}

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub include_index: bool,
    pub max_rows: usize,
    pub max_col_width: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            include_index: false,
            max_rows: DEFAULT_MAX_ROWS,
            max_col_width: DEFAULT_MAX_COL_WIDTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTable {
    pub text: String,
    pub omitted_rows: usize,
}

/// Validates headers and rows, then renders at most `max_rows` of them.
pub fn render_table(
    headers: Option<&Value>,
    rows: Option<&Value>,
    options: TableOptions,
) -> Result<RenderedTable, TableError> {
    let headers = table_headers(headers)?;
    let rows = match rows {
        None => Vec::new(),
        Some(Value::Array(rows)) => rows
            .iter()
            .enumerate()
            .map(|(index, row)| table_row(&headers, row, options.include_index.then_some(index + 1)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(TableError::InvalidRows),
    };

    let mut columns = Vec::with_capacity(headers.len() + 1);
    if options.include_index {
        columns.push(INDEX_HEADER.to_string());
    }
    columns.extend(headers);

    let shown = rows.len().min(options.max_rows);
    Ok(RenderedTable {
        text: render_ascii_table(&columns, &rows[..shown], options.max_col_width),
        omitted_rows: rows.len() - shown,
    })
}

fn table_headers(headers: Option<&Value>) -> Result<Vec<String>, TableError> {
    let headers = match headers {
        Some(Value::Array(headers)) if !headers.is_empty() => headers,
        _ => return Err(TableError::InvalidHeaders),
    };
    headers
        .iter()
        .map(|header| {
            header
                .as_str()
                .map(str::to_string)
                .ok_or(TableError::NonStringHeader)
        })
        .collect()
}

fn table_row(headers: &[String], row: &Value, index: Option<usize>) -> Result<Vec<String>, TableError> {
    let mut cells = Vec::with_capacity(headers.len() + 1);
    if let Some(index) = index {
        cells.push(index.to_string());
    }
    match row {
        Value::Array(values) => {
            cells.extend((0..headers.len()).map(|column| cell_text(values.get(column))));
        }
        Value::Object(values) => {
            cells.extend(headers.iter().map(|header| cell_text(values.get(header))));
        }
        _ => return Err(TableError::InvalidRow),
    }
    Ok(cells)
}

/// Stringifies a cell: missing/null → "", strings verbatim, numbers and
/// booleans as literals, everything else as compact JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn render_ascii_table(headers: &[String], rows: &[Vec<String>], max_col_width: usize) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .map(|row| row.get(column).map_or(0, |cell| display_width(cell)))
                .fold(display_width(header), usize::max)
                .min(max_col_width)
        })
        .collect();

    let format_row = |row: &[String]| {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(column, &width)| {
                let cell = row.get(column).map(String::as_str).unwrap_or_default();
                pad_right(&truncate_cell(cell, width), width)
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let separator: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers));
    lines.push(format!("| {} |", separator.join(" | ")));
    lines.extend(rows.iter().map(|row| format_row(row.as_slice())));
    lines.join("\n")
}

/// Cuts `value` to `width` columns, ending in an ellipsis when the column is
/// wide enough (4+) to keep it readable.
pub fn truncate_cell(value: &str, width: usize) -> String {
    if width >= 4 && display_width(value) <= width {
        return value.to_string();
    }
    let budget = if width >= 4 { width - 1 } else { width };
    let mut used = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        output.push(ch);
        used += ch_width;
    }
    if width >= 4 {
        output.push(ELLIPSIS);
    }
    output
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}
