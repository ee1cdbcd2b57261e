use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook as XlsxWorkbook};
use tracing::info;

use crate::error::{ExportError, ValidationError};
use crate::record::Record;
use crate::view::parse_number;

pub const SHEET_NAME: &str = "Records";
const HEADER_FILL: u32 = 0x4472C4;
const COLUMN_WIDTH_MARGIN: usize = 2;

/// Quote a value if it contains a delimiter, a quote or a line break. Quotes inside are
/// doubled.
pub fn wrap_cell_content(c: &str) -> String {
    let needs_wrapping = c.chars().any(|c| matches!(c, ',' | '"' | '\n' | '\r'));
    if needs_wrapping {
        format!("\"{}\"", c.replace('"', "\"\""))
    } else {
        c.to_string()
    }
}

pub fn csv_line<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(wrap_cell_content)
        .collect::<Vec<String>>()
        .join(",")
}

/// Header line plus one line per record, ids left out.
pub fn csv_payload(records: &[Record], headers: &[String]) -> Result<String, ValidationError> {
    if records.is_empty() {
        return Err(ValidationError::NothingToExport);
    }
    let mut out = csv_line(headers.iter().map(String::as_str));
    out.push('\n');
    for record in records {
        out.push_str(&csv_line(record.values(headers)));
        out.push('\n');
    }
    Ok(out)
}

pub fn write_csv(path: &Path, records: &[Record], headers: &[String]) -> Result<(), ExportError> {
    let payload = csv_payload(records, headers)?;
    fs::write(path, payload)?;
    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

/// Width of each column in characters: longest of header and cells, plus margin.
pub fn column_widths(records: &[Record], headers: &[String]) -> Vec<usize> {
    headers
        .iter()
        .map(|header| {
            let longest_cell = records
                .iter()
                .map(|r| r.get(header).map_or(0, |v| v.chars().count()))
                .max()
                .unwrap_or(0);
            header.chars().count().max(longest_cell) + COLUMN_WIDTH_MARGIN
        })
        .collect()
}

/// One sheet with a styled header row and sized columns. Values of `amount_column` that
/// parse as numbers are written as numbers.
pub fn build_workbook(
    records: &[Record],
    headers: &[String],
    amount_column: Option<&str>,
) -> Result<XlsxWorkbook, ExportError> {
    if records.is_empty() {
        return Err(ValidationError::NothingToExport.into());
    }

    let mut xlsx = XlsxWorkbook::new();
    let worksheet = xlsx.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_pattern(FormatPattern::Solid);

    for (col, (header, width)) in headers
        .iter()
        .zip(column_widths(records, headers))
        .enumerate()
    {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, header, &header_format)?;
        worksheet.set_column_width(col, width as f64)?;
    }

    for (ridx, record) in records.iter().enumerate() {
        let row = ridx as u32 + 1;
        for (col, header) in headers.iter().enumerate() {
            let col = col as u16;
            let value = record.get(header).unwrap_or("");
            let number = if amount_column == Some(header.as_str()) {
                parse_number(value)
            } else {
                None
            };
            match number {
                Some(n) => worksheet.write_number(row, col, n)?,
                None => worksheet.write_string(row, col, value)?,
            };
        }
    }

    Ok(xlsx)
}

pub fn write_xlsx(
    path: &Path,
    records: &[Record],
    headers: &[String],
    amount_column: Option<&str>,
) -> Result<(), ExportError> {
    let mut xlsx = build_workbook(records, headers, amount_column)?;
    xlsx.save(path)?;
    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}
