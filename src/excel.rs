use crate::error::Result;
use crate::export::unique_path;
use crate::render::{DisplayRow, ViewModel};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};

const FIELD_HEADERS: &[&str] = &["Field", "Value", "Confidence"];

/// Remove characters that can corrupt the sheet XML (control chars except tab/newline/CR).
fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            c == '\t' || c == '\n' || c == '\r' || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .collect()
}

fn write_text_cell_safe(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    worksheet
        .write_string_with_format(row, col, sanitize_cell(text), format)
        .map(|_| ())
}

/// Money cells are rendered as `$12.50`; write them back as numbers so the sheet can sum them.
fn write_value_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    amount_format: &Format,
    text_format: &Format,
) -> std::result::Result<(), XlsxError> {
    let unsigned = text.trim().replacen("-$", "-", 1).replacen('$', "", 1);
    if text.contains('$') {
        if let Ok(n) = unsigned.parse::<f64>() {
            return worksheet
                .write_number_with_format(row, col, n, amount_format)
                .map(|_| ());
        }
    }
    write_text_cell_safe(worksheet, row, col, text, text_format)
}

/// Estimate column width from text length (char count × 1.2, clamped 10–50).
fn estimate_text_width(text: &str) -> f64 {
    let w = text.chars().count() as f64 * 1.2;
    w.clamp(10.0, 50.0)
}

fn column_widths<'a>(headers: &[&str], rows: impl Iterator<Item = Vec<&'a str>>) -> Vec<f64> {
    let mut widths: Vec<f64> = headers.iter().map(|h| estimate_text_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = w.max(estimate_text_width(cell));
            }
        }
    }
    widths
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x2563EB))
        .set_font_color(Color::RGB(0xFFFFFF))
}

/// Default file for a document: `Document_{id}_{timestamp}.xlsx` in `dir`.
pub fn default_workbook_path(dir: &Path, document_id: i64) -> PathBuf {
    let now = chrono::Local::now();
    unique_path(
        dir,
        &format!("Document_{}_{}", document_id, now.format("%Y%m%d_%H%M%S")),
        "xlsx",
    )
}

/// Write the rendered document to a workbook: a "Fields" sheet and, when present, an "Items" sheet.
pub fn export_view_to_excel(view: &ViewModel, path: &Path) -> Result<PathBuf> {
    let mut path = path.to_path_buf();
    if path.extension().and_then(|e| e.to_str()) != Some("xlsx") {
        path.set_extension("xlsx");
    }

    let header = header_format();
    let text_wrap = Format::new().set_text_wrap();
    let amount = Format::new()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right);

    let mut workbook = Workbook::new();

    let fields: Vec<(&str, &str, String)> = view
        .rows
        .iter()
        .filter_map(|r| match r {
            DisplayRow::Field {
                label,
                value,
                confidence,
                ..
            } => Some((
                label.as_str(),
                value.as_str(),
                confidence.as_ref().map(|c| c.percent.clone()).unwrap_or_default(),
            )),
            DisplayRow::Items { .. } => None,
        })
        .collect();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Fields")?;
        let widths = column_widths(
            FIELD_HEADERS,
            fields.iter().map(|(l, v, c)| vec![*l, *v, c.as_str()]),
        );
        for (col, w) in widths.iter().enumerate() {
            sheet.set_column_width(col as u16, *w)?;
        }
        for (col, h) in FIELD_HEADERS.iter().enumerate() {
            write_text_cell_safe(sheet, 0, col as u16, h, &header)?;
        }
        write_text_cell_safe(sheet, 1, 0, "Document Type", &text_wrap)?;
        write_text_cell_safe(sheet, 1, 1, &view.badge.label, &text_wrap)?;
        for (i, (label, value, confidence)) in fields.iter().enumerate() {
            let row = (i + 2) as u32;
            write_text_cell_safe(sheet, row, 0, label, &text_wrap)?;
            write_value_cell(sheet, row, 1, value, &amount, &text_wrap)?;
            write_text_cell_safe(sheet, row, 2, confidence, &text_wrap)?;
        }
        sheet.set_freeze_panes(1, 0)?;
    }

    if let Some(DisplayRow::Items {
        table: Some(table), ..
    }) = view.items()
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Items")?;
        let widths = column_widths(
            &table.columns,
            table.rows.iter().map(|r| r.iter().map(String::as_str).collect()),
        );
        for (col, w) in widths.iter().enumerate() {
            sheet.set_column_width(col as u16, *w)?;
        }
        for (col, h) in table.columns.iter().enumerate() {
            write_text_cell_safe(sheet, 0, col as u16, h, &header)?;
        }
        for (i, cells) in table.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                write_value_cell(sheet, (i + 1) as u32, col as u16, cell, &amount, &text_wrap)?;
            }
        }
        sheet.set_freeze_panes(1, 0)?;
    }

    workbook.save(&path)?;
    tracing::info!(path = %path.display(), "workbook saved");
    Ok(path)
}
